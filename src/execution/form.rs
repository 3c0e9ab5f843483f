//! Posts offers through the site's HTML forms over a cookie-backed HTTP session.

use super::executor::{SubmissionPort, SubmissionReceipt, SubmissionRequest};
use crate::error::SubmissionFailure;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::time::Duration;

pub const EMAIL_FIELD: &str = "user_email";
pub const PASSWORD_FIELD: &str = "user_password";
pub const AMOUNT_FIELD: &str = "offer_amount";
pub const DURATION_FIELD: &str = "offer_duration";
pub const MESSAGE_FIELD: &str = "offer_comments_attributes_0_content";

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub struct FormSubmitter {
    client: Client,
    base_url: Url,
    sign_in_path: String,
    credentials: Credentials,
    authenticated: bool,
}

impl FormSubmitter {
    pub fn new(
        base_url: &str,
        sign_in_path: &str,
        request_timeout_ms: u64,
        credentials: Credentials,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .context("failed to build submission HTTP client")?;
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid submission base url: {}", base_url))?;
        Ok(Self {
            client,
            base_url,
            sign_in_path: sign_in_path.to_string(),
            credentials,
            authenticated: false,
        })
    }

    async fn fetch_page(&self, url: &Url, step: &str) -> Result<String, SubmissionFailure> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_failure(e, url, step))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SubmissionFailure::Navigation {
                url: url.to_string(),
                reason: format!("status {}", status),
            });
        }
        resp.text()
            .await
            .map_err(|e| transport_failure(e, url, step))
    }

    /// Load the offer form for a listing: first the listing page itself, then
    /// its `offers/new` page when the form is not inlined.
    async fn offer_form_page(&self, link: &str) -> Result<(Url, String), SubmissionFailure> {
        let listing_url = Url::parse(link).map_err(|e| SubmissionFailure::Navigation {
            url: link.to_string(),
            reason: e.to_string(),
        })?;
        let html = self.fetch_page(&listing_url, "listing page").await?;
        if has_field(&html, AMOUNT_FIELD) {
            return Ok((listing_url, html));
        }

        let mut form_url = listing_url.clone();
        form_url.set_path(&format!("{}/offers/new", listing_url.path().trim_end_matches('/')));
        let html = self.fetch_page(&form_url, "offer form").await?;
        Ok((form_url, html))
    }
}

#[async_trait]
impl SubmissionPort for FormSubmitter {
    async fn authenticate(&mut self) -> Result<(), SubmissionFailure> {
        if self.authenticated {
            return Ok(());
        }
        let sign_in_url = self
            .base_url
            .join(&self.sign_in_path)
            .map_err(|e| SubmissionFailure::Authentication(e.to_string()))?;

        let html = self.fetch_page(&sign_in_url, "sign-in page").await?;
        for field in [EMAIL_FIELD, PASSWORD_FIELD] {
            if !has_field(&html, field) {
                return Err(SubmissionFailure::MissingElement(field.to_string()));
            }
        }
        let target = find_form(&html, EMAIL_FIELD).ok_or_else(|| {
            SubmissionFailure::MissingElement("sign-in form".to_string())
        })?;
        let token = target.authenticity_token.unwrap_or_default();
        let action = target
            .action
            .and_then(|a| sign_in_url.join(&a).ok())
            .unwrap_or_else(|| sign_in_url.clone());

        let form = [
            ("authenticity_token", token.as_str()),
            ("user[email]", self.credentials.email.as_str()),
            ("user[password]", self.credentials.password.as_str()),
            ("commit", "Se connecter"),
        ];
        let resp = self
            .client
            .post(action.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_failure(e, &action, "sign-in"))?;

        let status = resp.status();
        // A successful sign-in redirects away from the sign-in page.
        if !status.is_success() || resp.url().path() == sign_in_url.path() {
            return Err(SubmissionFailure::Authentication(format!(
                "sign-in rejected ({}) at {}",
                status,
                resp.url()
            )));
        }

        tracing::info!(email = %self.credentials.email, "signed in");
        self.authenticated = true;
        Ok(())
    }

    async fn submit(
        &mut self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        let (page_url, html) = self.offer_form_page(&request.link).await?;
        for field in [AMOUNT_FIELD, DURATION_FIELD, MESSAGE_FIELD] {
            if !has_field(&html, field) {
                return Err(SubmissionFailure::MissingElement(field.to_string()));
            }
        }

        let target = find_form(&html, AMOUNT_FIELD)
            .ok_or_else(|| SubmissionFailure::MissingElement("offer form".to_string()))?;
        let action = target
            .action
            .ok_or_else(|| SubmissionFailure::MissingElement("offer form action".to_string()))?;
        let action = page_url
            .join(&action)
            .map_err(|e| SubmissionFailure::Navigation {
                url: action.clone(),
                reason: e.to_string(),
            })?;
        let token = target.authenticity_token.unwrap_or_default();

        let amount = request.amount.to_string();
        let duration = request.duration_days.to_string();
        let form = [
            ("authenticity_token", token.as_str()),
            ("offer[amount]", amount.as_str()),
            ("offer[duration]", duration.as_str()),
            ("offer[comments_attributes][0][content]", request.message.as_str()),
            ("commit", "Publier mon offre"),
        ];

        let resp = self
            .client
            .post(action.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_failure(e, &action, "offer submission"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SubmissionFailure::Rejected {
                url: action.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::info!(
            link = %request.link,
            amount = request.amount,
            duration_days = request.duration_days,
            "offer submitted"
        );
        Ok(SubmissionReceipt::Live)
    }
}

fn transport_failure(err: reqwest::Error, url: &Url, step: &str) -> SubmissionFailure {
    if err.is_timeout() {
        SubmissionFailure::Timeout(step.to_string())
    } else {
        SubmissionFailure::Navigation {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Target and CSRF token of the form enclosing a given field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    pub action: Option<String>,
    pub authenticity_token: Option<String>,
}

fn id_selector(id: &str) -> Option<Selector> {
    Selector::parse(&format!("#{}", id)).ok()
}

/// Whether an element with the given `id` attribute is present.
pub fn has_field(html: &str, id: &str) -> bool {
    let document = Html::parse_document(html);
    id_selector(id).is_some_and(|sel| document.select(&sel).next().is_some())
}

/// The `<form>` holding the element with `field_id`: its `action` and the
/// `authenticity_token` input posted with it. The page's `csrf-token` meta tag
/// stands in when the form carries no token input. `None` when the field is
/// absent or sits outside any form.
pub fn find_form(html: &str, field_id: &str) -> Option<FormTarget> {
    let document = Html::parse_document(html);
    let field = id_selector(field_id)?;
    let forms = Selector::parse("form").ok()?;
    let token_input = Selector::parse(r#"input[name="authenticity_token"]"#).ok()?;
    let csrf_meta = Selector::parse(r#"meta[name="csrf-token"]"#).ok()?;

    let form = document
        .select(&forms)
        .find(|form| form.select(&field).next().is_some())?;

    let authenticity_token = form
        .select(&token_input)
        .next()
        .and_then(|input| input.value().attr("value"))
        .or_else(|| {
            document
                .select(&csrf_meta)
                .next()
                .and_then(|meta| meta.value().attr("content"))
        })
        .map(str::to_string);

    Some(FormTarget {
        action: form.value().attr("action").map(str::to_string),
        authenticity_token,
    })
}
