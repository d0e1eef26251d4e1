use std::sync::Arc;

use aws_sdk_sesv2::{
    Client as SesClient,
    types::{Body, Content, Destination, EmailContent, Message},
};

use crate::{
    error::{AppError, Result},
    models::Order,
};

/// Sends order notifications through SES.
pub struct OrderMailer {
    client: SesClient,
    sender: String,
}

impl OrderMailer {
    pub fn new(client: SesClient, sender: String) -> Self {
        Self { client, sender }
    }

    pub async fn send_order_confirmation(&self, order: &Order) -> Result<()> {
        let html = render_confirmation(order);

        let destination = Destination::builder()
            .to_addresses(&order.owner_email)
            .build();

        let subject = Content::builder()
            .data(format!("Order {} confirmed", order.order_id))
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build subject: {}", e)))?;

        let html_body = Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTML body: {}", e)))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().html(html_body).build())
            .build();

        let content = EmailContent::builder().simple(message).build();

        self.client
            .send_email()
            .from_email_address(&self.sender)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {:?}", e);
                AppError::InternalError("Failed to send order confirmation".to_string())
            })?;

        Ok(())
    }
}

/// Fire-and-forget: a failed email never affects the order.
pub fn spawn_order_confirmation(mailer: Option<Arc<OrderMailer>>, order: Order) {
    let Some(mailer) = mailer else {
        return;
    };
    if order.owner_email.is_empty() {
        return;
    }

    tokio::spawn(async move {
        match mailer.send_order_confirmation(&order).await {
            Ok(()) => tracing::info!(order_id = %order.order_id, "Order confirmation sent"),
            Err(e) => tracing::warn!(order_id = %order.order_id, error = %e, "Order confirmation not sent"),
        }
    });
}

pub fn render_confirmation(order: &Order) -> String {
    let template = include_str!("../utils/order_confirmation.html");

    let rows: String = order
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{} ({})</td><td>{}</td><td>{}</td></tr>",
                escape(&item.name),
                escape(&item.size),
                item.quantity,
                item.line_total()
            )
        })
        .collect();

    template
        .replace("{{order_id}}", &order.order_id)
        .replace("{{items}}", &rows)
        .replace("{{subtotal}}", &order.subtotal.to_string())
        .replace("{{shipping}}", &order.shipping_charges.to_string())
        .replace("{{tax}}", &order.tax.to_string())
        .replace("{{total}}", &order.total.to_string())
        .replace(
            "{{estimated_delivery}}",
            &order.estimated_delivery.format("%d %b %Y").to_string(),
        )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
