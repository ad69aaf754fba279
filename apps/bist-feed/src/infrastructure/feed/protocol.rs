//! Feed Wire Protocol
//!
//! Line-oriented text protocol. Every line starts with a 3-digit message
//! type code followed by fields separated by the ASCII Unit Separator.
//! Framing is newline-delimited; there are no length prefixes.

use std::sync::Arc;

/// Field separator byte.
pub const FIELD_SEPARATOR: char = '\u{1F}';

/// Line terminator.
pub const LINE_TERMINATOR: char = '\n';

/// Length of the message type code.
pub const TYPE_CODE_LEN: usize = 3;

/// Shortest line that can carry a real message.
pub const MIN_LINE_LEN: usize = 10;

// =============================================================================
// Message Types
// =============================================================================

/// Message type identified by the 3-character prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `001` security create.
    SecurityCreate,
    /// `002` security delete.
    SecurityDelete,
    /// `012` session time.
    SessionTime,
    /// `020` news headline.
    NewsHeadline,
    /// `021` news body.
    NewsBody,
    /// `022` news delete.
    NewsDelete,
    /// `060` generic field update.
    FieldUpdate,
    /// `061` generic field refresh.
    FieldRefresh,
    /// `062` depth insert.
    DepthInsert,
    /// `063` depth refresh.
    DepthRefresh,
    /// `064` depth update.
    DepthUpdate,
    /// `065` depth delete.
    DepthDelete,
    /// Any other code, or a line too short to carry one.
    Unknown,
}

impl MessageType {
    /// Resolve a type code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "001" => Self::SecurityCreate,
            "002" => Self::SecurityDelete,
            "012" => Self::SessionTime,
            "020" => Self::NewsHeadline,
            "021" => Self::NewsBody,
            "022" => Self::NewsDelete,
            "060" => Self::FieldUpdate,
            "061" => Self::FieldRefresh,
            "062" => Self::DepthInsert,
            "063" => Self::DepthRefresh,
            "064" => Self::DepthUpdate,
            "065" => Self::DepthDelete,
            _ => Self::Unknown,
        }
    }

    /// Wire code, or `None` for [`MessageType::Unknown`].
    #[must_use]
    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::SecurityCreate => Some("001"),
            Self::SecurityDelete => Some("002"),
            Self::SessionTime => Some("012"),
            Self::NewsHeadline => Some("020"),
            Self::NewsBody => Some("021"),
            Self::NewsDelete => Some("022"),
            Self::FieldUpdate => Some("060"),
            Self::FieldRefresh => Some("061"),
            Self::DepthInsert => Some("062"),
            Self::DepthRefresh => Some("063"),
            Self::DepthUpdate => Some("064"),
            Self::DepthDelete => Some("065"),
            Self::Unknown => None,
        }
    }

    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecurityCreate => "security_create",
            Self::SecurityDelete => "security_delete",
            Self::SessionTime => "session_time",
            Self::NewsHeadline => "news_headline",
            Self::NewsBody => "news_body",
            Self::NewsDelete => "news_delete",
            Self::FieldUpdate => "field_update",
            Self::FieldRefresh => "field_refresh",
            Self::DepthInsert => "depth_insert",
            Self::DepthRefresh => "depth_refresh",
            Self::DepthUpdate => "depth_update",
            Self::DepthDelete => "depth_delete",
            Self::Unknown => "unknown",
        }
    }

    /// Worker queue that owns this message family.
    #[must_use]
    pub const fn queue(self) -> QueueKind {
        match self {
            Self::SecurityCreate => QueueKind::Create,
            Self::SecurityDelete => QueueKind::Delete,
            Self::SessionTime => QueueKind::SessionTime,
            Self::NewsHeadline | Self::NewsBody | Self::NewsDelete => QueueKind::News,
            Self::FieldUpdate | Self::FieldRefresh => QueueKind::Update,
            Self::DepthInsert | Self::DepthRefresh | Self::DepthUpdate => QueueKind::Depth,
            Self::DepthDelete | Self::Unknown => QueueKind::Unknown,
        }
    }
}

// =============================================================================
// Queues
// =============================================================================

/// Type-scoped worker queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Security create.
    Create,
    /// Security delete.
    Delete,
    /// Session time.
    SessionTime,
    /// News headline, body and delete.
    News,
    /// Generic field update and refresh.
    Update,
    /// Depth insert, refresh and update.
    Depth,
    /// Unrecognized, short and unimplemented messages.
    Unknown,
}

impl QueueKind {
    /// Every queue, in index order.
    pub const ALL: [Self; 7] = [
        Self::Create,
        Self::Delete,
        Self::SessionTime,
        Self::News,
        Self::Update,
        Self::Depth,
        Self::Unknown,
    ];

    /// Position in [`QueueKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::SessionTime => "session_time",
            Self::News => "news",
            Self::Update => "update",
            Self::Depth => "depth",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Feed Line
// =============================================================================

/// Why a line ended up in the Unknown queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    /// Shorter than [`MIN_LINE_LEN`].
    TooShort,
    /// Type code not recognized.
    UnrecognizedType,
    /// Recognized but deliberately not decoded.
    NotImplemented,
}

/// One complete, routed line.
#[derive(Debug, Clone)]
pub struct FeedLine {
    /// Message type from the prefix.
    pub message_type: MessageType,
    /// Set for lines routed to the Unknown queue.
    pub unknown_reason: Option<UnknownReason>,
    /// Full line as received, terminator stripped.
    pub raw: Arc<str>,
}

impl FeedLine {
    /// Classify a complete line.
    #[must_use]
    pub fn classify(line: &str) -> Self {
        let raw: Arc<str> = Arc::from(line);

        if line.chars().count() < MIN_LINE_LEN {
            return Self {
                message_type: MessageType::Unknown,
                unknown_reason: Some(UnknownReason::TooShort),
                raw,
            };
        }

        let message_type = split_type_code(line).map_or(MessageType::Unknown, |(code, _)| {
            MessageType::from_code(code)
        });
        let unknown_reason = match message_type {
            MessageType::Unknown => Some(UnknownReason::UnrecognizedType),
            MessageType::DepthDelete => Some(UnknownReason::NotImplemented),
            _ => None,
        };

        Self {
            message_type,
            unknown_reason,
            raw,
        }
    }

    /// Queue that owns this line.
    #[must_use]
    pub const fn queue(&self) -> QueueKind {
        self.message_type.queue()
    }

    /// Payload after the type code.
    #[must_use]
    pub fn payload(&self) -> &str {
        split_type_code(&self.raw).map_or("", |(_, payload)| payload)
    }

    /// Payload fields, trailing empty fields included.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        split_fields(self.payload())
    }
}

/// Split a line into its type code and payload.
#[must_use]
pub fn split_type_code(line: &str) -> Option<(&str, &str)> {
    let boundary = line
        .char_indices()
        .nth(TYPE_CODE_LEN)
        .map_or(line.len(), |(i, _)| i);
    if line[..boundary].chars().count() < TYPE_CODE_LEN {
        return None;
    }
    Some(line.split_at(boundary))
}

/// Split a payload on [`FIELD_SEPARATOR`], keeping every field.
#[must_use]
pub fn split_fields(payload: &str) -> Vec<&str> {
    payload.split(FIELD_SEPARATOR).collect()
}

/// Drop empty fields from the end.
pub fn trim_trailing_empty(fields: &mut Vec<&str>) {
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
}
