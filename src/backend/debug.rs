// Diagnostics - Validation layer messages
//
// The debug messenger forwards every driver message into an injected
// DiagnosticSink. The production sink keeps a durable log file and
// echoes warnings and errors to the operator through the `log` facade.

use ash::vk;
use parking_lot::Mutex;
use std::ffi::{c_void, CStr};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map the driver's severity bit to our ordering. Unknown bits are verbose.
    pub fn from_vk(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Severity::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Severity::Info
        } else {
            Severity::Verbose
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Verbose => "VERBOSE",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Receiver for driver diagnostics.
///
/// The driver may call this from its own thread, hence `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, severity: Severity, message: &str);
}

/// Append-only log file plus operator-visible echo for severity >= warning
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileSink {
    fn report(&self, severity: Severity, message: &str) {
        let line = format_line(SystemTime::now(), severity, message);
        {
            let mut file = self.file.lock();
            // A broken log file must not take the driver call down with it
            if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
                log::error!("Failed to write {:?}: {}", self.path, e);
            }
        }

        match severity {
            Severity::Error => log::error!("[Vulkan] {}", message),
            Severity::Warning => log::warn!("[Vulkan] {}", message),
            _ => log::debug!("[Vulkan] {}", message),
        }
    }
}

/// `<unix seconds>.<millis> [SEVERITY] message`
pub fn format_line(at: SystemTime, severity: Severity, message: &str) -> String {
    let since_epoch = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!(
        "{}.{:03} [{}] {}",
        since_epoch.as_secs(),
        since_epoch.subsec_millis(),
        severity,
        message
    )
}

/// Messenger settings shared by instance creation (p_next) and the
/// standalone messenger.
///
/// `user_data` must point at an `Arc<dyn DiagnosticSink>` that outlives
/// every messenger created from this info.
pub fn messenger_create_info(user_data: *mut c_void) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .user_data(user_data)
        .build()
}

/// Heap slot that pins a sink at a stable address for the driver
pub(crate) type SinkSlot = Box<Arc<dyn DiagnosticSink>>;

pub(crate) fn sink_user_data(slot: &SinkSlot) -> *mut c_void {
    let sink: *const Arc<dyn DiagnosticSink> = &**slot;
    sink as *mut c_void
}

// Debug callback for validation layers
pub(crate) unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || p_user_data.is_null() {
        return vk::FALSE;
    }

    let data = &*p_callback_data;
    let message = if data.p_message.is_null() {
        "<no message>".into()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy()
    };

    let sink = &*(p_user_data as *const Arc<dyn DiagnosticSink>);
    sink.report(Severity::from_vk(message_severity), &message);

    // Never abort the call that triggered the message
    vk::FALSE
}
