use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Level {
	Info,
	Warning,
}

/// A transient, non-blocking message for the player.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notification {
	pub level: Level,
	pub message: Box<str>,
}

impl Display for Notification {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.level {
			Level::Info => write!(f, "{}", self.message),
			Level::Warning => write!(f, "warning: {}", self.message),
		}
	}
}

#[derive(Clone)]
pub struct Notifier(broadcast::Sender<Notification>);

impl Notifier {
	pub fn new() -> Self {
		Self(broadcast::channel(64).0)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
		self.0.subscribe()
	}

	pub fn info(&self, message: impl Into<Box<str>>) {
		self.send(Level::Info, message.into());
	}

	pub fn warn(&self, message: impl Into<Box<str>>) {
		self.send(Level::Warning, message.into());
	}

	fn send(&self, level: Level, message: Box<str>) {
		// Nobody listening is fine, notifications are best effort
		let _ = self.0.send(Notification { level, message });
	}
}

impl Default for Notifier {
	fn default() -> Self {
		Self::new()
	}
}
