//! Core notification record types.
//!
//! A [`Notification`] is the persisted unit of work: created `Pending`,
//! transitioned to `Sent` by the dispatcher once at least one channel
//! delivery succeeds. The channel selector is a proper set of [`Channel`]
//! values; its wire/storage form stays the legacy comma-joined string
//! (`"EMAIL,SMS,WHATSAPP"`) for compatibility with upstream producers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A delivery medium for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    Whatsapp,
}

impl Channel {
    /// All supported channels, in the order they are attempted.
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Whatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
            Channel::Whatsapp => "WHATSAPP",
        }
    }

    /// Human-readable name used in dispatch summary lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "SMS",
            Channel::Whatsapp => "WhatsApp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Channel::Email),
            "SMS" => Ok(Channel::Sms),
            "WHATSAPP" => Ok(Channel::Whatsapp),
            _ => Err(()),
        }
    }
}

/// The channel selector on a record: which media the notification targets.
///
/// Membership is defined over the [`Channel`] enum, replacing the free-text
/// substring checks of earlier designs. Parsing is case-insensitive and
/// drops unknown tokens, so a selector made only of unknown tokens is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSet {
    email: bool,
    sms: bool,
    whatsapp: bool,
}

impl ChannelSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Selector covering every supported channel (the creation default).
    pub fn all() -> Self {
        Self {
            email: true,
            sms: true,
            whatsapp: true,
        }
    }

    pub fn insert(&mut self, channel: Channel) {
        match channel {
            Channel::Email => self.email = true,
            Channel::Sms => self.sms = true,
            Channel::Whatsapp => self.whatsapp = true,
        }
    }

    pub fn contains(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Whatsapp => self.whatsapp,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.email || self.sms || self.whatsapp)
    }

    /// Members in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.iter().copied().filter(|c| self.contains(*c))
    }
}

impl FromStr for ChannelSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = ChannelSet::empty();
        for token in s.split(',') {
            if let Ok(channel) = token.parse::<Channel>() {
                set.insert(channel);
            }
        }
        Ok(set)
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for channel in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(channel.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for ChannelSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Lifecycle status of a notification record.
///
/// There is no terminal failure state: a record whose dispatch never
/// succeeds stays `Pending` indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Sent,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Sent => "SENT",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Status::Pending),
            "SENT" => Ok(Status::Sent),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// The persisted notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Subject line
    pub affair: String,
    /// Body text
    pub body: String,
    /// Recipient email address
    pub email: String,
    /// Recipient phone number
    pub number: String,
    pub channels: ChannelSet,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    /// Set if and only if status is `Sent`
    pub send_at: Option<DateTime<Utc>>,
}

/// A record about to be persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub affair: String,
    pub body: String,
    pub email: String,
    pub number: String,
    pub channels: ChannelSet,
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    /// Build a fresh pending record targeting every supported channel.
    pub fn pending(affair: String, email: String, body: String, number: String) -> Self {
        Self {
            affair,
            body,
            email,
            number,
            channels: ChannelSet::all(),
            created_at: Utc::now(),
        }
    }

    pub fn into_notification(self, id: Uuid) -> Notification {
        Notification {
            id,
            affair: self.affair,
            body: self.body,
            email: self.email,
            number: self.number,
            channels: self.channels,
            status: Status::Pending,
            created_at: self.created_at,
            send_at: None,
        }
    }
}

/// Content handed to a channel transport adapter.
///
/// Email-style adapters use subject and body separately; SMS/WhatsApp
/// adapters concatenate them into a single text.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(subject: &str, body: &str) -> Self {
        Self {
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    /// Single-text form for plain-text media.
    pub fn as_text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

/// Outcome of one channel attempt within a dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    pub success: bool,
    /// Failure reason when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ChannelOutcome {
    pub fn ok(channel: Channel) -> Self {
        Self {
            channel,
            success: true,
            detail: None,
        }
    }

    pub fn failed(channel: Channel, detail: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            detail: Some(detail.into()),
        }
    }
}

/// Result of a dispatch: per-channel outcomes plus whether the record
/// transitioned to `Sent`.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub notification_id: Uuid,
    pub sent: bool,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchSummary {
    /// Derive the legacy free-text summary, one line per channel attempted.
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|o| {
                if o.success {
                    format!("sending {} notification", o.channel.display_name())
                } else {
                    format!(
                        "sending {} notification failed: {}",
                        o.channel.display_name(),
                        o.detail.as_deref().unwrap_or("unknown error")
                    )
                }
            })
            .collect()
    }
}
