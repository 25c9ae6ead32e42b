use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// A work unit failure carrying only a message.
    pub fn work_unit(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::WorkUnit {
                message: message.into(),
                source: None,
            }
            .into(),
        )
    }

    /// A work unit failure wrapping the error that caused it.
    pub fn work_unit_source<E>(message: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::WorkUnit {
                message: message.into(),
                source: Some(Box::new(source)),
            }
            .into(),
        )
    }

    pub fn panicked(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::WorkUnitPanicked {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn cancelled() -> Error {
        Error(ErrorKind::Cancelled.into())
    }

    pub fn disconnected(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::Disconnected {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("work unit failed: {message}")]
    WorkUnit {
        message: String,
        #[source]
        source: Option<StdErrorBoxed>,
    },

    #[error("work unit panicked: {message}")]
    WorkUnitPanicked { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("channel disconnected: {context}")]
    Disconnected { context: String },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl<T> From<std::sync::mpsc::SendError<T>> for Error {
    fn from(_: std::sync::mpsc::SendError<T>) -> Self {
        Error::disconnected("send")
    }
}

impl From<std::sync::mpsc::RecvError> for Error {
    fn from(_: std::sync::mpsc::RecvError) -> Self {
        Error::disconnected("recv")
    }
}
