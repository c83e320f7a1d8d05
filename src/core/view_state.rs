// src/core/view_state.rs
//! 视图流程: Form -> Loading -> Result

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::form::{AnalysisRequest, AnalysisResponse, Domain, FormError};
use crate::core::report_input::Report;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("cannot {action} while {state}")]
    IllegalTransition { action: &'static str, state: &'static str },
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Clone)]
pub enum ViewState {
    Form { last_error: Option<String> },
    Loading { domain: &'static Domain, request: AnalysisRequest },
    Result {
        domain: &'static Domain,
        report: Report,
        processing_time: Option<f64>,
        architecture: Option<String>,
    },
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Form { .. } => "form",
            ViewState::Loading { .. } => "loading",
            ViewState::Result { .. } => "result",
        }
    }
}

pub struct ViewFlow {
    state: ViewState,
    placeholder: String,
}

impl ViewFlow {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: ViewState::Form { last_error: None },
            placeholder: placeholder.into(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    fn illegal(&self, action: &'static str) -> ViewError {
        ViewError::IllegalTransition { action, state: self.state.name() }
    }

    /// Form -> Loading. The request must validate.
    pub fn submit(&mut self, request: AnalysisRequest) -> Result<&'static Domain, ViewError> {
        if !matches!(self.state, ViewState::Form { .. }) {
            return Err(self.illegal("submit"));
        }
        let domain = request.validate()?;
        debug!("View: form -> loading ({})", domain.id);
        self.state = ViewState::Loading { domain, request };
        Ok(domain)
    }

    /// Loading -> Result, or back to Form when the backend reports failure
    pub fn complete(&mut self, response: AnalysisResponse) -> Result<&ViewState, ViewError> {
        let domain = match &self.state {
            ViewState::Loading { domain, .. } => *domain,
            _ => return Err(self.illegal("complete")),
        };

        if !response.success {
            let message = response.error.unwrap_or_else(|| "分析失敗".to_string());
            warn!("Analysis failed: {}", message);
            self.state = ViewState::Form { last_error: Some(message) };
            return Ok(&self.state);
        }

        let report = Report::from_value(response.result.as_ref(), &self.placeholder);
        let processing_time = response.processing_time();
        debug!("View: loading -> result ({} block(s))", report.document.blocks.len());
        self.state = ViewState::Result {
            domain,
            report,
            processing_time,
            architecture: response.architecture,
        };
        Ok(&self.state)
    }

    /// Loading -> Form after a transport error
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ViewError> {
        if !matches!(self.state, ViewState::Loading { .. }) {
            return Err(self.illegal("fail"));
        }
        self.state = ViewState::Form { last_error: Some(message.into()) };
        Ok(())
    }

    /// Any state -> empty Form
    pub fn restart(&mut self) {
        self.state = ViewState::Form { last_error: None };
    }
}
