//! Typed Onsikku endpoints built on [`ApiClient::fetch`].

use http::Method;
use serde::de::IgnoredAny;
use serde_json::{Value as JsonValue, json};

use crate::client::{ApiClient, RequestOptions};
use crate::error::Result;
use crate::models::{
    AnswerContent, AnswerType, CommentUpdate, MyPage, MyPagePatch, NewComment, Notification,
    QuestionResponse, ReactionType, SignupRequest,
};
use crate::storage::TokenStorage;
use crate::transport::Transport;
use crate::types::TokenPair;

impl<T: Transport, S: TokenStorage> ApiClient<T, S> {
    // Members

    /// Profile, family and family members of the signed-in member.
    ///
    /// # Errors
    ///
    /// Returns the error from [`fetch`](Self::fetch): classified business or
    /// auth failures, [`Error::SessionExpired`](crate::Error::SessionExpired)
    /// after a failed renewal, transport errors, or [`Error::Decode`](crate::Error::Decode)
    /// if the payload does not match.
    pub async fn my_page(&self) -> Result<MyPage> {
        self.fetch("/api/members/mypage", RequestOptions::get()).await
    }

    /// Apply a sparse profile update and return the updated page.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn update_my_page(&self, patch: &MyPagePatch) -> Result<MyPage> {
        self.fetch("/api/members/mypage", RequestOptions::patch().with_json(patch)?)
            .await
    }

    /// Delete the account. Tokens are left to the caller's
    /// [`clear_tokens`](Self::clear_tokens).
    ///
    /// # Errors
    ///
    /// Returns the error from [`fetch`](Self::fetch); the response body is ignored.
    pub async fn delete_member(&self) -> Result<()> {
        self.fetch::<IgnoredAny>("/api/members/delete", RequestOptions::post())
            .await?;
        Ok(())
    }

    /// Log out on the server, then drop local tokens whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the server call's error; local tokens are cleared regardless.
    pub async fn logout(&self) -> Result<()> {
        let outcome = self
            .fetch_text("/api/members/logout", RequestOptions::post())
            .await;
        self.clear_tokens().await;
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Server logout failed; local session cleared");
        }
        outcome.map(|_| ())
    }

    /// Finish registration with the registration token and activate the
    /// returned session.
    ///
    /// # Errors
    ///
    /// Classified errors from the signup call, or [`Error::Storage`](crate::Error::Storage)
    /// if the returned tokens cannot be persisted.
    pub async fn signup(&self, request: &SignupRequest) -> Result<TokenPair> {
        let body = serde_json::to_string(request)?;
        let payload = self
            .send_public(Method::POST, "/api/auth/signup", Some(body))
            .await?;
        let pair = TokenPair::from_payload(payload)?;
        self.activate(&pair).await?;
        tracing::info!("Signup completed");
        Ok(pair)
    }

    // Questions

    /// Today's question for each family member.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn today_questions(&self) -> Result<QuestionResponse> {
        self.fetch("/api/questions", RequestOptions::get()).await
    }

    /// One member question with its answer, reactions and comments.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn question_details(&self, member_question_id: &str) -> Result<QuestionResponse> {
        let path = format!("/api/questions/{}", urlencoding::encode(member_question_id));
        self.fetch(&path, RequestOptions::get()).await
    }

    /// Questions sent during `month` (1-12) of `year`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn monthly_questions(&self, year: i32, month: u8) -> Result<QuestionResponse> {
        let path = format!("/api/questions/monthly?year={year}&month={month}");
        self.fetch(&path, RequestOptions::get()).await
    }

    // Answers

    /// Answer a member question. Text content is sent as `{ "text": ... }`.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn create_answer(
        &self,
        member_question_id: &str,
        answer_type: AnswerType,
        content: impl Into<AnswerContent>,
    ) -> Result<JsonValue> {
        let body = json!({
            "memberQuestionId": member_question_id,
            "answerType": answer_type,
            "content": content.into().to_json(),
        });
        self.fetch("/api/questions/answers", RequestOptions::post().with_json(&body)?)
            .await
    }

    /// Replace the content of an existing answer.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn update_answer(
        &self,
        answer_id: &str,
        member_question_id: &str,
        content: impl Into<AnswerContent>,
    ) -> Result<JsonValue> {
        let body = json!({
            "answerId": answer_id,
            "memberQuestionId": member_question_id,
            "content": content.into().to_json(),
        });
        self.fetch("/api/questions/answers", RequestOptions::patch().with_json(&body)?)
            .await
    }

    /// Delete an answer.
    ///
    /// # Errors
    ///
    /// Returns the error from [`fetch`](Self::fetch); the response body is ignored.
    pub async fn delete_answer(&self, answer_id: &str, member_question_id: &str) -> Result<()> {
        let body = json!({
            "answerId": answer_id,
            "memberQuestionId": member_question_id,
        });
        self.fetch::<IgnoredAny>(
            "/api/questions/test/answers",
            RequestOptions::delete().with_json(&body)?,
        )
        .await?;
        Ok(())
    }

    /// React to a family member's answer.
    ///
    /// # Errors
    ///
    /// Returns the error from [`fetch`](Self::fetch); the response body is ignored.
    pub async fn add_reaction(&self, answer_id: &str, reaction: ReactionType) -> Result<()> {
        let body = json!({ "answerId": answer_id, "type": reaction });
        self.fetch::<IgnoredAny>("/api/reactions", RequestOptions::post().with_json(&body)?)
            .await?;
        Ok(())
    }

    /// Notifications for the signed-in member, newest first as sent by the server.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.fetch("/api/notifications", RequestOptions::get()).await
    }

    // Comments

    /// Comment on a member question, or reply to a comment.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn create_comment(&self, comment: &NewComment) -> Result<JsonValue> {
        self.fetch("/api/comments", RequestOptions::post().with_json(comment)?)
            .await
    }

    /// Edit one of the member's comments.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn update_comment(&self, update: &CommentUpdate) -> Result<JsonValue> {
        self.fetch("/api/comments", RequestOptions::patch().with_json(update)?)
            .await
    }

    /// Delete one of the member's comments.
    ///
    /// # Errors
    ///
    /// Returns the error from [`fetch`](Self::fetch); the response body is ignored.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let path = format!("/api/comments/{}", urlencoding::encode(comment_id));
        self.fetch::<IgnoredAny>(&path, RequestOptions::delete()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::models::{FamilyMode, FamilyRole, Gender};
    use crate::storage::{ACCESS_TOKEN_KEY, MemoryStorage, REFRESH_TOKEN_KEY};
    use crate::testutil::{ScriptedTransport, bearer, reply, reply_text, test_client};

    fn body_of(request: &crate::transport::HttpRequest) -> JsonValue {
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }

    fn member(id: &str, role: &str) -> JsonValue {
        json!({ "id": id, "familyRole": role, "nickname": id })
    }

    #[tokio::test]
    async fn my_page_decodes_and_derives_gender() {
        let transport = ScriptedTransport::new(|_| {
            Ok(reply(200, json!({
                "isSuccess": true,
                "result": {
                    "member": member("m1", "SON"),
                    "family": { "id": "f1", "familyName": "김씨네", "invitationCode": "XYZ" },
                    "familyMembers": [member("m1", "SON"), member("m2", "MOTHER")],
                }
            })))
        });
        let client = test_client(transport, MemoryStorage::new());

        let page = client.my_page().await.unwrap();
        assert_eq!(page.family.family_name, "김씨네");
        assert_eq!(page.member.gender(), Gender::Male);
        assert_eq!(page.family_members[1].gender(), Gender::Female);
    }

    #[tokio::test]
    async fn update_my_page_sends_sparse_patch() {
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.method, Method::PATCH);
            assert_eq!(body_of(req), json!({ "isAlarmEnabled": false }));
            Ok(reply(200, json!({
                "member": member("m1", "FATHER"),
                "family": { "id": "f1", "familyName": "f", "invitationCode": "c" },
            })))
        });
        let client = test_client(transport, MemoryStorage::new());

        let page = client
            .update_my_page(&MyPagePatch::default().with_alarm_enabled(false))
            .await
            .unwrap();
        assert_eq!(page.member.family_role, FamilyRole::Father);
    }

    #[tokio::test]
    async fn logout_clears_tokens_even_on_failure() {
        let storage = MemoryStorage::new();
        storage.set(ACCESS_TOKEN_KEY, "a1").await.unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").await.unwrap();
        let transport = ScriptedTransport::new(|_| Ok(reply(500, json!({ "message": "서버 오류" }))));
        let client = test_client(transport, storage);
        client.restore_session().await.unwrap();

        let err = client.logout().await.unwrap_err();
        assert!(matches!(err, Error::Business { status: 500, .. }));
        assert!(client.session().access_token().is_none());
        assert_eq!(client.storage().snapshot(ACCESS_TOKEN_KEY), None);
        assert_eq!(client.storage().snapshot(REFRESH_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn logout_accepts_text_body() {
        let transport = ScriptedTransport::new(|_| Ok(reply_text(200, "로그아웃 되었습니다")));
        let client = test_client(transport, MemoryStorage::new());
        client.session().set_access_token(Some("a1".into()));

        client.logout().await.unwrap();
        assert!(client.session().access_token().is_none());
    }

    #[tokio::test]
    async fn signup_is_public_and_activates() {
        let transport = ScriptedTransport::new(|req| {
            assert!(req.url.ends_with("/api/auth/signup"));
            assert_eq!(bearer(req), None);
            assert_eq!(body_of(req)["familyMode"], "CREATE");
            Ok(reply(200, json!({ "result": { "accessToken": "a1", "refreshToken": "r1", "registered": true } })))
        });
        let client = test_client(transport, MemoryStorage::new());
        client.session().set_access_token(Some("stale".into()));

        let request = SignupRequest {
            registration_token: "reg1".into(),
            family_role: FamilyRole::Mother,
            birth_date: "1975-03-04".into(),
            family_mode: FamilyMode::Create,
            nickname: Some("엄마".into()),
            profile_image_url: None,
            family_name: Some("우리집".into()),
            family_invitation_code: None,
        };
        let pair = client.signup(&request).await.unwrap();

        assert!(pair.is_account_registered);
        assert_eq!(client.session().access_token(), Some("a1".into()));
        assert_eq!(client.storage().snapshot(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn question_paths() {
        let transport = ScriptedTransport::new(|_| Ok(reply(200, json!({ "questionDetailsList": [] }))));
        let client = test_client(transport.clone(), MemoryStorage::new());

        client.today_questions().await.unwrap();
        client.question_details("mq 7").await.unwrap();
        client.monthly_questions(2024, 5).await.unwrap();

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            [
                "https://api.test/api/questions",
                "https://api.test/api/questions/mq%207",
                "https://api.test/api/questions/monthly?year=2024&month=5",
            ]
        );
    }

    #[tokio::test]
    async fn answer_calls_wrap_text_content() {
        let transport = ScriptedTransport::new(|_| Ok(reply(200, json!({ "result": { "id": "a1" } }))));
        let client = test_client(transport.clone(), MemoryStorage::new());

        client
            .create_answer("mq1", AnswerType::Text, "오늘은 맑음")
            .await
            .unwrap();
        client.update_answer("a1", "mq1", "수정").await.unwrap();
        client.delete_answer("a1", "mq1").await.unwrap();

        let sent = transport.requests();
        assert_eq!(
            body_of(&sent[0]),
            json!({ "memberQuestionId": "mq1", "answerType": "TEXT", "content": { "text": "오늘은 맑음" } })
        );
        assert_eq!(sent[1].method, Method::PATCH);
        assert_eq!(body_of(&sent[1])["content"], json!({ "text": "수정" }));
        assert_eq!(sent[2].method, Method::DELETE);
        assert!(sent[2].url.ends_with("/api/questions/test/answers"));
        assert_eq!(body_of(&sent[2]), json!({ "answerId": "a1", "memberQuestionId": "mq1" }));
    }

    #[tokio::test]
    async fn reactions_notifications_and_comments() {
        let transport = ScriptedTransport::new(|req| {
            if req.url.ends_with("/api/notifications") {
                Ok(reply(200, json!({ "result": [
                    { "id": "n1", "type": "COMMENT", "content": "댓글", "isRead": true }
                ] })))
            } else {
                Ok(reply(200, json!({ "isSuccess": true, "result": null })))
            }
        });
        let client = test_client(transport.clone(), MemoryStorage::new());

        client.add_reaction("a1", ReactionType::Funny).await.unwrap();
        let notifications = client.notifications().await.unwrap();
        client
            .create_comment(&NewComment {
                member_question_id: "mq1".into(),
                content: "좋아요".into(),
                parent_comment_id: None,
            })
            .await
            .unwrap();
        client
            .update_comment(&CommentUpdate {
                comment_id: "c1".into(),
                content: "수정".into(),
            })
            .await
            .unwrap();
        client.delete_comment("c1").await.unwrap();

        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].is_read);

        let sent = transport.requests();
        assert_eq!(body_of(&sent[0]), json!({ "answerId": "a1", "type": "FUNNY" }));
        assert_eq!(body_of(&sent[2]), json!({ "memberQuestionId": "mq1", "content": "좋아요" }));
        assert_eq!(sent[3].method, Method::PATCH);
        assert_eq!(sent[4].method, Method::DELETE);
        assert!(sent[4].url.ends_with("/api/comments/c1"));
    }
}
