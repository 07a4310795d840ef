use std::{error::Error, fmt};

pub type BackendResult<T> = Result<T, BackendError>;

pub const BACKEND_ERROR_NAME: &str = "BackendError";

type BoxedCause = Box<dyn Error + Send + Sync + 'static>;

/// Uniform shape of every failure reported by the wallet/ledger backend.
///
/// `backend_message` keeps the message exactly as the backend produced it, while `causes`
/// holds the rendered source chain so errors aggregating several inner failures keep all of
/// their messages.
pub struct BackendError {
    name: &'static str,
    message: String,
    backend_message: String,
    causes: Vec<String>,
    backtrace: Option<String>,
    source: Option<BoxedCause>,
}

fn format_error(err: &BackendError, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}: {}", err.name, err.message)?;
    if let Some(backtrace) = err.backtrace() {
        writeln!(f, "Backtrace: {}", backtrace)?;
    }
    for cause in &err.causes {
        writeln!(f, "Caused by:\n{}", cause)?;
    }
    Ok(())
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_error(self, f)
    }
}

impl fmt::Debug for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_error(self, f)
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|cause| -> &(dyn Error + 'static) { cause.as_ref() })
    }
}

fn try_capture_backtrace() -> Option<String> {
    #[cfg(feature = "backtrace_errors")]
    {
        use backtrace::Backtrace;

        let backtrace = Backtrace::new();
        let mut filtered_backtrace = String::new();

        for frame in backtrace.frames() {
            let symbols = frame.symbols();
            if let Some(symbol) = symbols.first() {
                if let (Some(filename), Some(line)) = (symbol.filename(), symbol.lineno()) {
                    filtered_backtrace.push_str(&format!("[{}:{}]", filename.display(), line));
                }
                if let Some(name) = symbol.name() {
                    filtered_backtrace.push_str(&format!(" {}", name));
                }
                filtered_backtrace.push('\n');
            }
        }
        Some(filtered_backtrace)
    }
    #[cfg(not(feature = "backtrace_errors"))]
    None
}

impl BackendError {
    /// Wraps an error raised by a backend capability, keeping its full source chain.
    pub fn normalize<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let message = err.to_string();
        let mut causes = Vec::new();
        let mut current = err.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        BackendError {
            name: BACKEND_ERROR_NAME,
            backend_message: message.clone(),
            message,
            causes,
            backtrace: try_capture_backtrace(),
            source: Some(Box::new(err)),
        }
    }

    pub fn from_msg<D>(msg: D) -> Self
    where
        D: fmt::Display,
    {
        let message = msg.to_string();
        BackendError {
            name: BACKEND_ERROR_NAME,
            backend_message: message.clone(),
            message,
            causes: Vec::new(),
            backtrace: try_capture_backtrace(),
            source: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backend_message(&self) -> &str {
        &self.backend_message
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }

    pub fn find_root_cause(&self) -> String {
        self.causes
            .last()
            .cloned()
            .unwrap_or_else(|| self.message.clone())
    }
}
