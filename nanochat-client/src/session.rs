use std::path::PathBuf;

use crate::{config::Config, connection::ConnectionManager};

/// Text accumulated with `add` and sent with `sendbuf`.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    text: String,
    separator: String,
}

impl MessageBuffer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            separator: separator.into(),
        }
    }

    /// Appends `segment`, inserting the separator only between two non-empty parts.
    pub fn add(&mut self, segment: &str) {
        if !self.text.is_empty() && !segment.is_empty() {
            self.text.push_str(&self.separator);
        }
        self.text.push_str(segment);
    }

    pub fn contents(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// State shared by every command handler for the lifetime of the REPL.
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    pub connection: ConnectionManager,
    pub buffer: MessageBuffer,
}

impl Session {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        let buffer = MessageBuffer::new(config.buffer_add_sep.clone());
        Self {
            config,
            config_path,
            connection: ConnectionManager::new(),
            buffer,
        }
    }
}
