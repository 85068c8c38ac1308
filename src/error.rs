use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A raw results document is missing a required field or carries the wrong type.
    #[error("malformed input for {}: {detail}", origin(.event_id, .dcat_id))]
    MalformedInput {
        event_id: Option<u32>,
        dcat_id: Option<u32>,
        detail: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn malformed(event_id: Option<u32>, dcat_id: Option<u32>, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            event_id,
            dcat_id,
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Configuration(detail.into())
    }
}

fn origin(event_id: &Option<u32>, dcat_id: &Option<u32>) -> String {
    match (event_id, dcat_id) {
        (Some(event), Some(dcat)) => format!("event {event} dcat {dcat}"),
        (Some(event), None) => format!("event {event}"),
        (None, Some(dcat)) => format!("dcat {dcat}"),
        (None, None) => "document".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
