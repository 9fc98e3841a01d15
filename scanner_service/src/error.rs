use std::fmt::{self, Debug, Display};

pub struct SimpleError {
    pub msg: String,
}

impl SimpleError {
    pub fn new(msg: &str) -> Self {
        Self {
            msg: msg.to_owned(),
        }
    }
}

impl<T> From<T> for SimpleError where T: Display {
    fn from(err: T) -> Self {
        Self {
            msg: format!("{}", err),
        }
    }
}

impl Debug for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

pub trait LogError {
    fn log_error(self, tag: &str) -> Self where Self: Sized;
    fn log_error_consume(self, tag: &str);
    fn log_warn_consume(self, tag: &str);
}

impl<T, E> LogError for Result<T, E> where E: Debug {
    fn log_error(self, tag: &str) -> Self {
        if let Err(err) = &self {
            log::error!("[{}] {:?}", tag, err);
        }
        self
    }
    fn log_error_consume(self, tag: &str) {
        if let Err(err) = self {
            log::error!("[{}] {:?}", tag, err);
        }
    }
    fn log_warn_consume(self, tag: &str) {
        if let Err(err) = self {
            log::warn!("[{}] {:?}", tag, err);
        }
    }
}
