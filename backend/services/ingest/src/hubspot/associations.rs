use std::collections::HashMap;

use super::client::HubSpotClient;
use super::models::AssociationBatchResponse;
use super::objects::ObjectType;
use super::token::AccountContext;

/// Batch lookups of related records. Associations only enrich events, so
/// failures degrade to empty results instead of failing the pass. A 401
/// triggers one token refresh and a retry.
pub struct AssociationResolver<'a> {
    client: &'a HubSpotClient,
}

impl<'a> AssociationResolver<'a> {
    pub fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    /// Map each source id to its first associated target id.
    pub async fn resolve(
        &self,
        ctx: &mut AccountContext,
        from: ObjectType,
        to: ObjectType,
        ids: &[String],
    ) -> HashMap<String, String> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let mut refreshed = false;
        loop {
            let result = self
                .client
                .read_associations(ctx.access_token(), from.api_name(), to.api_name(), ids)
                .await;

            match result {
                Ok(response) => return first_targets(response),
                Err(e) if e.is_unauthorized() && !refreshed => {
                    refreshed = true;
                    if !self.refresh(ctx).await {
                        return HashMap::new();
                    }
                }
                Err(e) => {
                    tracing::error!(
                        hub_id = %ctx.hub_id(),
                        from = %from,
                        to = %to,
                        error = %e,
                        "failed to fetch associations, continuing without them"
                    );
                    return HashMap::new();
                }
            }
        }
    }

    /// Look up the email of each contact id. Contacts that cannot be read
    /// or have no email are left out.
    pub async fn resolve_contact_emails(
        &self,
        ctx: &mut AccountContext,
        contact_ids: &[String],
    ) -> HashMap<String, String> {
        let mut emails = HashMap::new();
        let mut refreshed = false;

        for contact_id in contact_ids {
            if emails.contains_key(contact_id) {
                continue;
            }

            loop {
                let result = self
                    .client
                    .get_object(
                        ctx.access_token(),
                        ObjectType::Contacts.api_name(),
                        contact_id,
                        &["email"],
                    )
                    .await;

                match result {
                    Ok(contact) => {
                        if let Some(email) = contact.property("email") {
                            emails.insert(contact_id.clone(), email.to_string());
                        }
                    }
                    Err(e) if e.is_unauthorized() && !refreshed => {
                        refreshed = true;
                        if self.refresh(ctx).await {
                            continue;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            hub_id = %ctx.hub_id(),
                            contact_id = %contact_id,
                            error = %e,
                            "failed to fetch contact email"
                        );
                    }
                }
                break;
            }
        }

        emails
    }

    async fn refresh(&self, ctx: &mut AccountContext) -> bool {
        match ctx.refresh_token(self.client).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    hub_id = %ctx.hub_id(),
                    operation = "refresh_access_token",
                    error = %e,
                    "token refresh after association 401 failed"
                );
                false
            }
        }
    }
}

/// Keep the first target per source. Results without a `from` side or
/// without any target are discarded.
pub fn first_targets(response: AssociationBatchResponse) -> HashMap<String, String> {
    response
        .results
        .into_iter()
        .filter_map(|result| {
            let from = result.from?;
            let to = result.to.into_iter().next()?;
            Some((from.id, to.id))
        })
        .collect()
}
