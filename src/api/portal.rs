//! HTTP client for the course portal
//!
//! Login is a two-host dance: credentials (plus device fingerprints) go
//! to the identity provider as a form POST, which answers with a redirect
//! script carrying a one-time ticket; following that ticket "roams" the
//! session into the learning site, which drops session cookies and a CSRF
//! token. From then on the cookie jar authenticates every request and the
//! CSRF token rides along as a query parameter.

use anyhow::{Context, Result};
use regex_lite::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url, header};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Language, PortalUrls};
use crate::models::CourseRole;

use super::error::{ApiError, ApiResult, FailReason};
use super::types::{self, ContentKind, RawCourse, RawUserInfo, SemesterInfo};
use super::{
    CredentialProvider, LoginArgs, Portal, SESSION_EXPIRED_MARKER, SessionSnapshot,
    SubmitAttachment,
};

const USER_AGENT: &str = concat!("satchel/", env!("CARGO_PKG_VERSION"));

/// Cookie holding the server-side session
const SESSION_COOKIE: &str = "JSESSIONID";
/// Cookie the learning site mirrors its CSRF token into
const CSRF_COOKIE: &str = "XSRF-TOKEN";

// Identity provider paths
const LOGIN_PATH: &str = "/do/off/ui/auth/login/check";

// Learning site paths
const LOGOUT_PATH: &str = "/f/logout";
const SEMESTER_LIST_PATH: &str = "/b/kc/semester/list";
const CURRENT_SEMESTER_PATH: &str = "/b/kc/semester/current";
const COURSE_LIST_PATH: &str = "/b/kc/course/list";
const BULK_CONTENT_PATH: &str = "/b/kc/content/bulk";
const USER_INFO_PATH: &str = "/b/xt/user/info";
const HOMEWORK_SUBMIT_PATH: &str = "/b/kc/homework/submit";

/// Cookie-jar-backed session state, replaced wholesale on reset
struct Session {
    http: Client,
    jar: Arc<Jar>,
    csrf: String,
}

/// Client for one course portal deployment
pub struct PortalClient {
    id_url: Url,
    learn_url: Url,
    timeout: Duration,
    provider: Option<CredentialProvider>,
    session: RwLock<Session>,
    /// Jar-less client for requests authenticated by an explicit
    /// [`SessionSnapshot`] instead of the live cookie jar
    bare: Client,
}

impl PortalClient {
    /// Create a client for the given portal hosts.
    ///
    /// The provider, when given, supplies stored credentials to login
    /// attempts that do not carry their own.
    pub fn new(
        urls: &PortalUrls,
        timeout: Duration,
        provider: Option<CredentialProvider>,
    ) -> Result<Self> {
        let id_url = Url::parse(urls.id_base.trim_end_matches('/'))
            .context("Invalid identity provider base URL")?;
        let learn_url = Url::parse(urls.learn_base.trim_end_matches('/'))
            .context("Invalid learning site base URL")?;

        let session = Self::make_session(timeout)?;
        let bare = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            id_url,
            learn_url,
            timeout,
            provider,
            session: RwLock::new(session),
            bare,
        })
    }

    fn make_session(timeout: Duration) -> Result<Session> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_provider(jar.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Session {
            http,
            jar,
            csrf: String::new(),
        })
    }

    /// Clone of the jar-backed client (cheap, shares the connection pool)
    fn http(&self) -> Client {
        self.session.read().unwrap().http.clone()
    }

    /// Cookie header value for the learning site, as the jar sees it
    fn cookie_header(&self) -> String {
        let session = self.session.read().unwrap();
        session
            .jar
            .cookies(&self.learn_url)
            .and_then(|value| value.to_str().map(String::from).ok())
            .unwrap_or_default()
    }

    /// Read one cookie's value out of the jar
    fn cookie_value(&self, name: &str) -> Option<String> {
        let header = self.cookie_header();
        header.split("; ").find_map(|pair| {
            pair.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(String::from)
        })
    }

    /// Expire the auth cookies on both hosts.
    ///
    /// Runs before every login attempt so a half-dead session can never
    /// contaminate the fresh one.
    fn clear_login_cookies(&self) {
        let session = self.session.read().unwrap();
        for url in [&self.id_url, &self.learn_url] {
            for name in [SESSION_COOKIE, CSRF_COOKIE] {
                session
                    .jar
                    .add_cookie_str(&format!("{name}=; Path=/; Max-Age=0"), url);
            }
        }
        debug!("cleared login cookies on both hosts");
    }

    /// Append the CSRF token to a URL
    fn with_csrf(&self, url: &str, csrf: &str) -> String {
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}_csrf={}", urlencoding::encode(csrf))
    }

    /// GET a learning site endpoint, returning the body after session and
    /// status checks
    async fn get_body(&self, url: &str) -> ApiResult<String> {
        let (http, csrf) = {
            let session = self.session.read().unwrap();
            (session.http.clone(), session.csrf.clone())
        };

        let response = http.get(self.with_csrf(url, &csrf)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::with_extra(
                FailReason::UnexpectedStatus,
                status.to_string(),
            ));
        }

        let body = response.text().await?;
        if body.contains(SESSION_EXPIRED_MARKER) || body.trim_start().starts_with('<') {
            return Err(ApiError::new(FailReason::NotLoggedIn));
        }
        Ok(body)
    }

    fn learn_endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.learn_url.as_str().trim_end_matches('/'))
    }
}

/// Pull the redirect target out of the identity provider's answer page.
///
/// A successful credential check responds with a tiny HTML page whose
/// script navigates to the ticket URL.
fn extract_redirect(body: &str) -> Option<String> {
    Regex::new(r#"location\.replace\("([^"]+)"\)"#)
        .ok()?
        .captures(body)
        .map(|caps| caps[1].to_string())
}

impl Portal for PortalClient {
    async fn login(&self, args: LoginArgs) -> ApiResult<()> {
        // A stale session must never leak into a new login attempt
        self.clear_login_cookies();

        let stored = self
            .provider
            .as_ref()
            .and_then(|provider| provider())
            .unwrap_or_default();
        let username = args.username.unwrap_or(stored.username);
        let password = args.password.unwrap_or(stored.password);
        let fingerprint = args.fingerprint.unwrap_or(stored.fingerprint);
        let finger_gen_print = args.finger_gen_print.unwrap_or(stored.finger_gen_print);
        let finger_gen_print3 = args.finger_gen_print3.unwrap_or(stored.finger_gen_print3);

        if username.is_empty() || password.is_empty() || fingerprint.is_empty() {
            return Err(ApiError::new(FailReason::NoCredential));
        }

        // Log presence, never values
        info!(
            has_username = !username.is_empty(),
            has_password = !password.is_empty(),
            has_fingerprint = !fingerprint.is_empty(),
            has_finger_gen_print = !finger_gen_print.is_empty(),
            "logging in to portal"
        );

        let http = self.http();

        // Step 1: credential check against the identity provider
        let form = [
            ("i_user", username.as_str()),
            ("i_pass", password.as_str()),
            ("fingerPrint", fingerprint.as_str()),
            ("fingerGenPrint", finger_gen_print.as_str()),
            ("fingerGenPrint3", finger_gen_print3.as_str()),
            ("singleLogin", "on"),
        ];
        let body = http
            .post(format!(
                "{}{LOGIN_PATH}",
                self.id_url.as_str().trim_end_matches('/')
            ))
            .form(&form)
            .send()
            .await?
            .text()
            .await?;

        let ticket_url = extract_redirect(&body).ok_or_else(|| {
            ApiError::with_extra(FailReason::IdTicket, "no redirect in login response")
        })?;
        if ticket_url.contains("status=BAD_CREDENTIALS") {
            return Err(ApiError::new(FailReason::BadCredential));
        }
        let ticket_url = if ticket_url.starts_with('/') {
            format!(
                "{}{ticket_url}",
                self.id_url.as_str().trim_end_matches('/')
            )
        } else {
            ticket_url
        };

        // Step 2: follow the ticket into the learning site
        let response = http.get(&ticket_url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::with_extra(
                FailReason::Roaming,
                response.status().to_string(),
            ));
        }

        // Step 3: adopt the CSRF token the learning site dropped
        let csrf = self.cookie_value(CSRF_COOKIE).ok_or_else(|| {
            ApiError::with_extra(FailReason::Roaming, "no CSRF cookie after roaming")
        })?;
        self.session.write().unwrap().csrf = csrf;

        info!("portal login complete");
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        // Best effort: the local session dies regardless of the answer
        let result = self
            .http()
            .post(self.learn_endpoint(LOGOUT_PATH))
            .send()
            .await;
        if let Err(err) = result {
            debug!("server-side logout failed: {err}");
        }

        self.reset();
        Ok(())
    }

    fn reset(&self) {
        match Self::make_session(self.timeout) {
            Ok(session) => *self.session.write().unwrap() = session,
            Err(err) => warn!("failed to rebuild portal session: {err}"),
        }
    }

    fn session_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            cookies: self.cookie_header(),
            csrf: self.session.read().unwrap().csrf.clone(),
        }
    }

    async fn semester_id_list(&self) -> ApiResult<Vec<String>> {
        let body = self
            .get_body(&self.learn_endpoint(SEMESTER_LIST_PATH))
            .await?;
        // The portal pads deleted semesters with nulls
        let ids: Vec<Option<String>> = types::parse_list(&body)?;
        Ok(ids.into_iter().flatten().filter(|id| !id.is_empty()).collect())
    }

    async fn current_semester(&self) -> ApiResult<SemesterInfo> {
        let body = self
            .get_body(&self.learn_endpoint(CURRENT_SEMESTER_PATH))
            .await?;
        types::parse_object(&body)
    }

    async fn course_list(
        &self,
        semester_id: &str,
        role: CourseRole,
        language: Language,
    ) -> ApiResult<Vec<RawCourse>> {
        let url = format!(
            "{}/{}/{role}/{language}",
            self.learn_endpoint(COURSE_LIST_PATH),
            urlencoding::encode(semester_id),
        );
        let body = self.get_body(&url).await?;
        types::parse_list(&body)
    }

    async fn course_contents(
        &self,
        session: &SessionSnapshot,
        course_ids: &[String],
        kind: ContentKind,
    ) -> ApiResult<String> {
        let url = self.with_csrf(&self.learn_endpoint(BULK_CONTENT_PATH), &session.csrf);
        let payload = serde_json::json!({
            "courseIds": course_ids,
            "contentType": kind.as_str(),
        });

        let response = self
            .bare
            .post(&url)
            .header(header::COOKIE, &session.cookies)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::with_extra(
                FailReason::UnexpectedStatus,
                status.to_string(),
            ));
        }

        // Returned raw: the caller probes for session expiry before parsing
        Ok(response.text().await?)
    }

    async fn user_info(&self, role: CourseRole) -> ApiResult<RawUserInfo> {
        let url = format!("{}?role={role}", self.learn_endpoint(USER_INFO_PATH));
        let body = self.get_body(&url).await?;
        types::parse_object(&body)
    }

    async fn download(&self, session: &SessionSnapshot, url: &str) -> ApiResult<Vec<u8>> {
        let response = self
            .bare
            .get(url)
            .header(header::COOKIE, &session.cookies)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::with_extra(
                FailReason::UnexpectedStatus,
                status.to_string(),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn submit_homework(
        &self,
        session: &SessionSnapshot,
        student_homework_id: &str,
        content: &str,
        attachment: Option<SubmitAttachment>,
    ) -> ApiResult<String> {
        let url = self.with_csrf(&self.learn_endpoint(HOMEWORK_SUBMIT_PATH), &session.csrf);

        let mut form = reqwest::multipart::Form::new()
            .text("studentHomeworkId", student_homework_id.to_string())
            .text("content", content.to_string());
        if let Some(attachment) = attachment {
            form = form.part(
                "file",
                reqwest::multipart::Part::bytes(attachment.bytes).file_name(attachment.file_name),
            );
        }

        let response = self
            .bare
            .post(&url)
            .header(header::COOKIE, &session.cookies)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::with_extra(
                FailReason::UnexpectedStatus,
                status.to_string(),
            ));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PortalClient {
        PortalClient::new(&PortalUrls::default(), Duration::from_secs(5), None).unwrap()
    }

    #[test]
    fn test_extract_redirect() {
        let body = r#"<script>location.replace("https://learn.campus.edu/f/auth/roaming?ticket=abc123")</script>"#;
        assert_eq!(
            extract_redirect(body).as_deref(),
            Some("https://learn.campus.edu/f/auth/roaming?ticket=abc123")
        );

        assert_eq!(extract_redirect("<html>nothing here</html>"), None);
    }

    #[test]
    fn test_with_csrf_separator() {
        let client = client();
        assert_eq!(
            client.with_csrf("https://x.test/a", "t"),
            "https://x.test/a?_csrf=t"
        );
        assert_eq!(
            client.with_csrf("https://x.test/a?role=student", "t"),
            "https://x.test/a?role=student&_csrf=t"
        );
    }

    #[test]
    fn test_fresh_client_has_empty_snapshot() {
        let snapshot = client().session_snapshot();
        assert!(snapshot.cookies.is_empty());
        assert!(snapshot.csrf.is_empty());
    }

    #[test]
    fn test_cookie_jar_roundtrip_and_clearing() {
        let client = client();
        {
            let session = client.session.read().unwrap();
            session
                .jar
                .add_cookie_str("JSESSIONID=abc123; Path=/", &client.learn_url);
            session
                .jar
                .add_cookie_str("XSRF-TOKEN=tok; Path=/", &client.learn_url);
        }

        assert_eq!(client.cookie_value("JSESSIONID").as_deref(), Some("abc123"));
        assert_eq!(client.cookie_value("XSRF-TOKEN").as_deref(), Some("tok"));
        assert!(client.session_snapshot().cookies.contains("JSESSIONID=abc123"));

        client.clear_login_cookies();
        assert_eq!(client.cookie_value("JSESSIONID"), None);
        assert_eq!(client.cookie_value("XSRF-TOKEN"), None);
    }

    #[test]
    fn test_reset_discards_session() {
        let client = client();
        {
            let mut session = client.session.write().unwrap();
            session.csrf = "tok".to_string();
            session
                .jar
                .add_cookie_str("JSESSIONID=abc123; Path=/", &client.learn_url);
        }
        assert!(!client.session_snapshot().csrf.is_empty());

        client.reset();
        let snapshot = client.session_snapshot();
        assert!(snapshot.cookies.is_empty());
        assert!(snapshot.csrf.is_empty());
    }
}
