use std::fmt::Formatter;

#[derive(Debug, Clone, PartialEq)]
pub enum XmError {
    /// Parameter is the selector of the content root that could not be found
    TargetNotFound(String),
    EmptyCollection,
    HttpFailure {
        status: u16,
        url: String,
    },
    NetworkFailure {
        url: String,
        message: String,
    },
    NavigationAbort,
    /// Parameter is the page url that isn't a profile's media tab
    NotMediaPage(String),
    /// Parameter is path to directory
    DestinationDirectoryDoesNotExist(String),
    /// parameters are file path, additional error message
    FileOperationError {
        file_name: String,
        message: String,
    },
    Config(String),
    UnknownError(String),
}

impl std::fmt::Display for XmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            XmError::TargetNotFound(selector) => {
                format!("content root {selector} not found on page, collection not started")
            }
            XmError::EmptyCollection => "no media was collected".to_string(),
            XmError::HttpFailure { status, url } => {
                format!("server returned an error response. {url} => {status}")
            }
            XmError::NetworkFailure { url, message } => {
                format!("network error fetching {url}. {message}")
            }
            XmError::NavigationAbort => {
                "left the media page while collecting, session discarded".to_string()
            }
            XmError::NotMediaPage(url) => {
                format!("{url} is not a media tab, batch download not started")
            }
            XmError::DestinationDirectoryDoesNotExist(dir) => {
                format!("the provided destination directory {dir}, does not exist.")
            }
            XmError::FileOperationError { file_name, message } => {
                format!("{message} : {file_name}")
            }
            XmError::Config(err) => format!("settings error. {err}"),
            XmError::UnknownError(err) => format!("an unknown error occurred. {err}"),
        };
        write!(f, "{str}")
    }
}

impl std::error::Error for XmError {}
