//! Payloads of the family Q&A endpoints.
//!
//! Timestamps stay as the server's strings; the backend emits local
//! date-times without an offset.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Missing (via `#[serde(default)]`) and `null` both decode to `T::default()`.
fn null_as_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyRole {
    Mother,
    Father,
    Daughter,
    Son,
    Grandmother,
    Grandfather,
}

impl FamilyRole {
    /// Gender implied by the role; the API never sends one.
    #[must_use]
    pub fn gender(self) -> Gender {
        match self {
            Self::Father | Self::Son | Self::Grandfather => Gender::Male,
            Self::Mother | Self::Daughter | Self::Grandmother => Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub family_name: String,
    pub invitation_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_invite_enabled: bool,
    #[serde(default)]
    pub last_ai_question_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub family_role: FamilyRole,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alarm_enabled: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Member {
    #[must_use]
    pub fn gender(&self) -> Gender {
        self.family_role.gender()
    }
}

/// `GET /api/members/mypage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPage {
    pub member: Member,
    pub family: Family,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_members: Vec<Member>,
}

/// Sparse profile update; only set fields are sent.
///
/// `profile_image_url: Some(None)` sends `null` and removes the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_role: Option<FamilyRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_alarm_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_family_invite_enabled: Option<bool>,
}

impl MyPagePatch {
    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    #[must_use]
    pub fn with_profile_image_url(mut self, url: Option<String>) -> Self {
        self.profile_image_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_family_role(mut self, role: FamilyRole) -> Self {
        self.family_role = Some(role);
        self
    }

    /// `yyyy-MM-dd`.
    #[must_use]
    pub fn with_birth_date(mut self, date: impl Into<String>) -> Self {
        self.birth_date = Some(date.into());
        self
    }

    #[must_use]
    pub fn with_alarm_enabled(mut self, enabled: bool) -> Self {
        self.is_alarm_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_family_invite_enabled(mut self, enabled: bool) -> Self {
        self.is_family_invite_enabled = Some(enabled);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyMode {
    Create,
    Join,
}

/// `POST /api/auth/signup`, sent with the registration token from login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub registration_token: String,
    pub family_role: FamilyRole,
    /// `yyyy-MM-dd`.
    pub birth_date: String,
    pub family_mode: FamilyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    /// Required with [`FamilyMode::Create`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Required with [`FamilyMode::Join`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_invitation_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionState {
    Pending,
    Sent,
    Read,
    Answered,
    Expired,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerType {
    Text,
    Image,
    Audio,
    Video,
    File,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionType {
    Like,
    Angry,
    Sad,
    Funny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    #[serde(default)]
    pub answer_type: Option<AnswerType>,
    #[serde(default)]
    pub content: JsonValue,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub parent_comment: Option<CommentRef>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One member's copy of a family question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetails {
    pub member_question_id: String,
    pub content: String,
    pub member: Member,
    #[serde(default)]
    pub answer: Option<Answer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub sent_date: Option<String>,
    #[serde(default)]
    pub question_status: Option<QuestionState>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub angry_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sad_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub funny_count: u32,
}

impl QuestionDetails {
    /// Reported status, else inferred from whether an answer exists.
    #[must_use]
    pub fn state(&self) -> QuestionState {
        self.question_status.unwrap_or(if self.answer.is_some() {
            QuestionState::Answered
        } else {
            QuestionState::Sent
        })
    }
}

/// Shared response of the question endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_details_list: Vec<QuestionDetails>,
    #[serde(default)]
    pub question_details: Option<QuestionDetails>,
    #[serde(default)]
    pub total_question_count: Option<u32>,
    #[serde(default)]
    pub answered_question_count: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_members: Vec<Member>,
}

impl QuestionResponse {
    /// The list form, falling back to the single `questionDetails`.
    #[must_use]
    pub fn details(&self) -> Vec<&QuestionDetails> {
        if self.question_details_list.is_empty() {
            self.question_details.iter().collect()
        } else {
            self.question_details_list.iter().collect()
        }
    }
}

/// Answer body: plain text or a structured (media) document.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerContent {
    Text(String),
    Structured(JsonValue),
}

impl AnswerContent {
    /// Wire form; text is wrapped as `{ "text": ... }`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Text(text) => serde_json::json!({ "text": text }),
            Self::Structured(value) => value.clone(),
        }
    }
}

impl From<&str> for AnswerContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for AnswerContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<JsonValue> for AnswerContent {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Comment,
    Reaction,
    Answer,
    AllAnswered,
    NewQuestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSender {
    pub id: String,
    pub family_role: FamilyRole,
}

impl NotificationSender {
    #[must_use]
    pub fn gender(&self) -> Gender {
        self.family_role.gender()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sender: Option<NotificationSender>,
}

/// New comment on a member question, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub member_question_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdate {
    pub comment_id: String,
    pub content: String,
}
