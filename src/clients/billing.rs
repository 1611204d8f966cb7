use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::clients::{
    BillingProvider, CheckoutSession, ClientError, ProviderCustomer, ProviderSubscription,
};

/// Stripe-compatible billing client. Only the handful of calls the
/// reconciler needs; everything else about the provider stays outside
/// this service.
pub struct StripeBilling {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeBilling {
    pub fn new(api_base: String, secret_key: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base,
            secret_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base.trim_end_matches('/'), path)
    }
}

#[derive(Deserialize)]
struct SessionWire {
    id: String,
    payment_status: String,
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct SubscriptionWire {
    id: String,
    items: SubscriptionItemsWire,
}

#[derive(Deserialize)]
struct SubscriptionItemsWire {
    data: Vec<SubscriptionItemWire>,
}

#[derive(Deserialize)]
struct SubscriptionItemWire {
    price: PriceWire,
}

#[derive(Deserialize)]
struct PriceWire {
    id: String,
}

#[derive(Deserialize)]
struct CustomerWire {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct CustomerListWire {
    data: Vec<CustomerWire>,
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::UnexpectedResponse(format!(
            "billing provider returned {status}"
        )));
    }
    Ok(response)
}

#[async_trait]
impl BillingProvider for StripeBilling {
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("checkout/sessions/{id}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let wire: SessionWire = expect_ok(response).await?.json().await?;
        Ok(CheckoutSession {
            id: wire.id,
            payment_status: wire.payment_status,
            customer_id: wire.customer,
            subscription_id: wire.subscription,
            metadata: wire.metadata,
        })
    }

    async fn retrieve_subscription(&self, id: &str) -> Result<ProviderSubscription, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("subscriptions/{id}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let wire: SubscriptionWire = expect_ok(response).await?.json().await?;
        Ok(ProviderSubscription {
            id: wire.id,
            price_id: wire.items.data.first().map(|item| item.price.id.clone()),
        })
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, ClientError> {
        let response = self
            .http
            .get(self.url("customers"))
            .query(&[("email", email), ("limit", "1")])
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let wire: CustomerListWire = expect_ok(response).await?.json().await?;
        Ok(wire.data.into_iter().next().map(|c| ProviderCustomer {
            id: c.id,
            email: c.email,
        }))
    }

    async fn create_customer(&self, email: &str) -> Result<ProviderCustomer, ClientError> {
        let response = self
            .http
            .post(self.url("customers"))
            .bearer_auth(&self.secret_key)
            .form(&[("email", email)])
            .send()
            .await?;
        let wire: CustomerWire = expect_ok(response).await?.json().await?;
        Ok(ProviderCustomer {
            id: wire.id,
            email: wire.email,
        })
    }
}
