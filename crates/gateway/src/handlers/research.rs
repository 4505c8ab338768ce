//! One-click research intake handler
//!
//! A GET endpoint so the link works straight from an email client. Every
//! valid click files a fresh request; clicking the same link again files
//! another one. The signature gates access, nothing is consumed by use.

use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use deepscout_common::{
    db::Repository,
    errors::{AppError, Result},
    metrics,
};

/// Query parameters carried by a one-click research link
#[derive(Debug, Deserialize, Validate)]
pub struct ResearchParams {
    /// Research topic
    #[validate(length(min = 1, max = 500))]
    pub q: String,

    /// Requesting user, an email address
    #[validate(length(min = 1, max = 320))]
    pub uid: String,

    /// Hex HMAC token over `{uid}:{q}`
    #[validate(length(min = 1))]
    pub tk: String,
}

/// Accept a research request from a signed link
pub async fn request_research(
    State(state): State<AppState>,
    Query(params): Query<ResearchParams>,
) -> Result<Html<String>> {
    if let Err(e) = params.validate() {
        metrics::record_intake("invalid");
        return Err(AppError::Validation {
            message: e.to_string(),
            field: None,
        });
    }

    // Signature check comes before any side effect; a rejected click must
    // leave no trace in the store
    if !state.signer.verify(&params.uid, &params.q, &params.tk) {
        metrics::record_intake("rejected");
        tracing::warn!(uid = %params.uid, "Rejected research link with bad signature");
        return Err(AppError::InvalidLink);
    }

    let repo = Repository::new(state.db.clone());
    let request_id = Uuid::new_v4();

    let request = match repo
        .insert_request(request_id, params.q.clone(), params.uid.clone())
        .await
    {
        Ok(request) => request,
        Err(err) => {
            metrics::record_intake("error");
            return Err(err);
        }
    };

    metrics::record_intake("queued");
    tracing::info!(
        request_id = %request.id,
        area = %request.area_of_interest,
        requested_by = %request.requested_by,
        "Research request queued"
    );

    Ok(Html(confirmation_page(&request.area_of_interest, request.id)))
}

/// Render the confirmation page shown after a successful click
fn confirmation_page(topic: &str, request_id: Uuid) -> String {
    format!(
        "<html>\n  <body>\n    <h3>✅ Your deep research request for “{topic}” is queued.</h3>\n    \
         <p>Request ID: {request_id}</p>\n    \
         <p><a href=\"/research/requests/{request_id}\">Check progress</a></p>\n  </body>\n</html>\n",
        topic = escape_html(topic),
        request_id = request_id
    )
}

/// Minimal HTML escaping for text interpolated into the confirmation page
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
