use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Window,
    Fit,
    Predict,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Window => "window",
            Stage::Fit => "fit",
            Stage::Predict => "predict",
        }
    }
}

/// Per-request pipeline failure. Recoverable: callers keep their previous result.
#[derive(Debug, Clone)]
pub struct ForecastError {
    pub stage: Stage,
    pub detail: String,
}

impl ForecastError {
    pub fn window(detail: impl Into<String>) -> Self {
        Self {
            stage: Stage::Window,
            detail: detail.into(),
        }
    }

    pub fn fit(detail: impl Into<String>) -> Self {
        Self {
            stage: Stage::Fit,
            detail: detail.into(),
        }
    }

    pub fn predict(detail: impl Into<String>) -> Self {
        Self {
            stage: Stage::Predict,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forecast error (stage={}): {}",
            self.stage.as_str(),
            self.detail
        )
    }
}

impl std::error::Error for ForecastError {}
