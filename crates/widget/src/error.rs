use mapservice::ServiceError;
use runtime::SequenceError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// The provider script has not signalled `load` yet.
    BindingNotLoaded,
    /// An event arrived before the coordinator was mounted and active.
    NotMounted,
    Service(ServiceError),
    Sequence(SequenceError),
    Config(ConfigError),
}

impl std::fmt::Display for WidgetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WidgetError::BindingNotLoaded => write!(f, "map binding not loaded"),
            WidgetError::NotMounted => write!(f, "map coordinator not mounted"),
            WidgetError::Service(e) => write!(f, "{e}"),
            WidgetError::Sequence(e) => write!(f, "geocode: {e}"),
            WidgetError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WidgetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WidgetError::Service(e) => Some(e),
            WidgetError::Sequence(e) => Some(e),
            WidgetError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ServiceError> for WidgetError {
    fn from(e: ServiceError) -> Self {
        WidgetError::Service(e)
    }
}

impl From<SequenceError> for WidgetError {
    fn from(e: SequenceError) -> Self {
        WidgetError::Sequence(e)
    }
}

impl From<ConfigError> for WidgetError {
    fn from(e: ConfigError) -> Self {
        WidgetError::Config(e)
    }
}
