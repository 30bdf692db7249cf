//! Launch intents delivered by the host.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::barrier::NativeFlag;

/// Intent extra that enables checked mode.
pub const EXTRA_ENABLE_CHECKED_MODE: &str = "enable-checked-mode";

/// What the host asked the activity to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
	Main,
	/// Load the URL in the intent data.
	View,
	/// Run the bundle whose path is the intent data.
	Run,
	Other(String),
}

impl FromStr for IntentAction {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let short = s.strip_prefix("android.intent.action.").unwrap_or(s);
		Ok(match short {
			"MAIN" => Self::Main,
			"VIEW" => Self::View,
			"RUN" => Self::Run,
			_ => Self::Other(s.to_string()),
		})
	}
}

/// A launch request. Everything in it is untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
	pub action: Option<IntentAction>,
	pub data: Option<String>,
	pub extras: BTreeMap<String, String>,
}

impl Intent {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn view(url: impl Into<String>) -> Self {
		Self {
			action: Some(IntentAction::View),
			data: Some(url.into()),
			..Self::default()
		}
	}

	pub fn run(bundle: impl Into<String>) -> Self {
		Self {
			action: Some(IntentAction::Run),
			data: Some(bundle.into()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extras.insert(key.into(), value.into());
		self
	}

	/// Native flags derived from the intent's extras.
	///
	/// Only allow-listed extras are honored; every other extra is ignored.
	pub fn native_flags(&self) -> Vec<NativeFlag> {
		let mut flags = Vec::new();
		if self.extras.get(EXTRA_ENABLE_CHECKED_MODE).is_some_and(|v| v == "true") {
			flags.push(NativeFlag::EnableCheckedMode);
		}
		flags
	}
}
