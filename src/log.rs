// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Process-wide renderer log. By default, it writes into the console only. To duplicate the
//! output into a file, call [`Log::set_file_name`] once at startup.
//!
//! Every diagnostic the renderer produces (incomplete render targets, invalid light handles,
//! light capacity overflow, missing cameras) goes through this log, so a host application can
//! subscribe with [`Log::add_listener`] and surface them in its own UI.

use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::{
    collections::hash_map::Entry,
    fmt::{Debug, Display},
    io::{self, Write},
    path::Path,
    sync::{mpsc::Sender, LazyLock},
    time::{Duration, Instant},
};

/// A message that is sent by the log to every listener.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Kind of the message: information, warning or error.
    pub kind: MessageKind,
    /// The message without the severity prefix.
    pub content: String,
    /// Time point at which the message was recorded, relative to the log creation.
    pub time: Duration,
}

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        file: None,
        verbosity: MessageKind::Information,
        listeners: Default::default(),
        time_origin: Instant::now(),
        one_shot_sources: Default::default(),
    })
});

/// Severity of a message.
#[derive(Debug, Default, Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Some useful information.
    #[default]
    Information = 0,
    /// Something went wrong, but the renderer is able to continue.
    Warning = 1,
    /// An error of some kind.
    Error = 2,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// See module docs.
pub struct Log {
    file: Option<std::fs::File>,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    time_origin: Instant,
    one_shot_sources: FxHashMap<usize, String>,
}

impl Log {
    /// Creates a new log file at the specified path. All further messages are duplicated there.
    pub fn set_file_name<P: AsRef<Path>>(path: P) {
        LOG.lock().file = std::fs::File::create(path).ok();
    }

    /// Sets new file to write the log to, `None` stops writing into a file.
    pub fn set_file(file: Option<std::fs::File>) {
        LOG.lock().file = file;
    }

    fn write_internal(&mut self, id: Option<usize>, kind: MessageKind, message: String) -> bool {
        if (kind as u32) < (self.verbosity as u32) {
            return false;
        }

        if let Some(id) = id {
            match self.one_shot_sources.entry(id) {
                Entry::Occupied(mut previous) => {
                    if previous.get() == &message {
                        return false;
                    }
                    previous.insert(message.clone());
                }
                Entry::Vacant(entry) => {
                    entry.insert(message.clone());
                }
            }
        }

        let time = self.time_origin.elapsed();
        // Disconnected listeners are dropped here.
        self.listeners.retain(|listener| {
            listener
                .send(LogMessage {
                    kind,
                    content: message.clone(),
                    time,
                })
                .is_ok()
        });

        let mut line = String::with_capacity(message.len() + 16);
        line.push_str(kind.prefix());
        line.push_str(&message);
        line.push('\n');

        let _ = io::stdout().write_all(line.as_bytes());
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }

        true
    }

    /// Writes a message of the given kind.
    pub fn writeln<S>(kind: MessageKind, msg: S)
    where
        S: AsRef<str>,
    {
        LOG.lock()
            .write_internal(None, kind, msg.as_ref().to_owned());
    }

    /// Writes a message only once per given id while the message stays the same. If the message
    /// changes, the new version is written. Use it for diagnostics that would otherwise be
    /// repeated every frame. Returns `true` if the message was written.
    pub fn writeln_once<S>(id: usize, kind: MessageKind, msg: S) -> bool
    where
        S: AsRef<str>,
    {
        LOG.lock()
            .write_internal(Some(id), kind, msg.as_ref().to_owned())
    }

    /// Writes an information message.
    pub fn info<S: AsRef<str>>(msg: S) {
        Self::writeln(MessageKind::Information, msg)
    }

    /// Writes a warning message.
    pub fn warn<S: AsRef<str>>(msg: S) {
        Self::writeln(MessageKind::Warning, msg)
    }

    /// Writes an error message.
    pub fn err<S: AsRef<str>>(msg: S) {
        Self::writeln(MessageKind::Error, msg)
    }

    /// Writes an information message once. See [`Self::writeln_once`] for more info.
    pub fn info_once<S: AsRef<str>>(id: usize, msg: S) -> bool {
        Self::writeln_once(id, MessageKind::Information, msg)
    }

    /// Writes a warning message once. See [`Self::writeln_once`] for more info.
    pub fn warn_once<S: AsRef<str>>(id: usize, msg: S) -> bool {
        Self::writeln_once(id, MessageKind::Warning, msg)
    }

    /// Writes an error message once. See [`Self::writeln_once`] for more info.
    pub fn err_once<S: AsRef<str>>(id: usize, msg: S) -> bool {
        Self::writeln_once(id, MessageKind::Error, msg)
    }

    /// Sets the minimal severity of messages that will be written.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Adds a listener that receives a copy of every written message.
    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    /// Writes the error into the log if the result is `Err`. Use it when an error can be
    /// ignored, but should still be visible.
    pub fn verify<T, E>(result: Result<T, E>)
    where
        E: Debug,
    {
        if let Err(e) = result {
            Self::err(format!("Operation failed! Reason: {e:?}"));
        }
    }

    /// Same as [`Self::verify`], but prefixes the error with a custom message.
    pub fn verify_message<S, T, E>(result: Result<T, E>, msg: S)
    where
        E: Debug,
        S: Display,
    {
        if let Err(e) = result {
            Self::err(format!("{msg}. Reason: {e:?}"));
        }
    }
}

/// Writes a formatted information message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::Log::info(format!($($arg)*))
    };
}

/// Writes a formatted warning message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::Log::warn(format!($($arg)*))
    };
}

/// Writes a formatted error message.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::log::Log::err(format!($($arg)*))
    };
}

/// Writes a formatted error message once per id.
#[macro_export]
macro_rules! err_once {
    ($id:expr, $($arg:tt)*) => {
        $crate::log::Log::err_once($id, format!($($arg)*))
    };
}

/// Writes a formatted warning message once per id.
#[macro_export]
macro_rules! warn_once {
    ($id:expr, $($arg:tt)*) => {
        $crate::log::Log::warn_once($id, format!($($arg)*))
    };
}
