use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{Cart, LineItem, ReplaceCartRequest, Session, SyncCartRequest},
    store::Store,
};

pub const MAX_LINE_QUANTITY: i32 = 999;

/// Adds two line quantities, capped at [`MAX_LINE_QUANTITY`].
pub fn add_quantity(current: i32, extra: i32) -> i32 {
    current.saturating_add(extra).min(MAX_LINE_QUANTITY)
}

/// Merges `local` into `remote` by (product_ref, size): matching lines have
/// their quantities summed, new lines are appended in their local order.
///
/// Local lines sharing a key with each other are folded together as well,
/// so the result never holds two rows for the same key. Summed quantities
/// stop at [`MAX_LINE_QUANTITY`] so the merged cart stays valid for
/// `PUT /cart` and checkout.
pub fn merge_items(remote: &[LineItem], local: &[LineItem]) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(remote.len() + local.len());

    for item in remote.iter().chain(local) {
        match merged.iter_mut().find(|existing| existing.key() == item.key()) {
            Some(existing) => existing.quantity = add_quantity(existing.quantity, item.quantity),
            None => merged.push(LineItem {
                quantity: item.quantity.min(MAX_LINE_QUANTITY),
                ..item.clone()
            }),
        }
    }

    merged
}

/// Replays local edits made since `sent` was merged upstream onto `merged`.
///
/// `merged` is the server's answer to a sync of `sent`. Whatever it holds
/// beyond `sent` came from the server; that part is kept and the current
/// `local` lines are added on top. Lines only present locally are appended.
pub fn rebase_items(merged: &[LineItem], sent: &[LineItem], local: &[LineItem]) -> Vec<LineItem> {
    fn quantity_of(items: &[LineItem], item: &LineItem) -> i32 {
        items
            .iter()
            .filter(|i| i.key() == item.key())
            .map(|i| i.quantity)
            .sum()
    }

    let mut rebased: Vec<LineItem> = Vec::with_capacity(merged.len() + local.len());

    for item in merged {
        let upstream = (item.quantity - quantity_of(sent, item)).max(0);
        let quantity = add_quantity(upstream, quantity_of(local, item));
        if quantity > 0 {
            rebased.push(LineItem {
                quantity,
                ..item.clone()
            });
        }
    }

    for item in local {
        if !rebased.iter().any(|existing| existing.key() == item.key())
            && !merged.iter().any(|existing| existing.key() == item.key())
        {
            rebased.push(item.clone());
        }
    }

    rebased
}

/// Validates and normalizes items received from a client.
pub fn normalize_items(items: Vec<LineItem>) -> Result<Vec<LineItem>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, mut item)| {
            item.product_ref = item.product_ref.trim().to_lowercase();
            item.size = item.size.trim().to_string();

            if item.product_ref.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "items[{}].productRef is required",
                    index
                )));
            }
            if item.size.is_empty() {
                return Err(AppError::BadRequest(format!("items[{}].size is required", index)));
            }
            if item.quantity < 1 || item.quantity > MAX_LINE_QUANTITY {
                return Err(AppError::BadRequest(format!(
                    "items[{}].quantity must be between 1 and {}",
                    index, MAX_LINE_QUANTITY
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(AppError::BadRequest(format!(
                    "items[{}].unitPrice must not be negative",
                    index
                )));
            }

            Ok(item)
        })
        .collect()
}

pub async fn get_cart(store: &dyn Store, session: &Session) -> Result<Cart> {
    store.get_or_create_cart(&session.owner_id).await
}

/// Merges a guest cart into the owner's stored cart at login.
pub async fn sync_cart(store: &dyn Store, session: &Session, req: SyncCartRequest) -> Result<Cart> {
    let local = normalize_items(req.items)?;
    let sync_token = req
        .sync_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let cart = store
        .merge_cart(&session.owner_id, &local, sync_token)
        .await?;

    tracing::info!(
        owner_id = %session.owner_id,
        local_lines = local.len(),
        lines = cart.items.len(),
        version = cart.version,
        "Cart synced"
    );

    Ok(cart)
}

pub async fn replace_cart(
    store: &dyn Store,
    session: &Session,
    req: ReplaceCartRequest,
) -> Result<Cart> {
    let items = merge_items(&[], &normalize_items(req.items)?);
    store
        .replace_cart(&session.owner_id, &items, req.expected_version)
        .await
}

pub async fn clear_cart(store: &dyn Store, session: &Session) -> Result<()> {
    store.clear_cart(&session.owner_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn item(product_ref: &str, size: &str, quantity: i32) -> LineItem {
        LineItem {
            product_ref: product_ref.to_string(),
            name: product_ref.to_uppercase(),
            image: format!("/img/{}.webp", product_ref),
            unit_price: dec!(25),
            quantity,
            size: size.to_string(),
            color: None,
        }
    }

    fn quantities(items: &[LineItem]) -> HashMap<(String, String), i32> {
        let mut map = HashMap::new();
        for i in items {
            *map.entry((i.product_ref.clone(), i.size.clone())).or_insert(0) += i.quantity;
        }
        map
    }

    #[test]
    fn sums_matching_keys_and_appends_new_ones() {
        let remote = vec![item("hoodie", "M", 1), item("cap", "OS", 2)];
        let local = vec![item("hoodie", "M", 2), item("hoodie", "L", 1)];

        let merged = merge_items(&remote, &local);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].quantity, 3);
        assert_eq!(merged[1].product_ref, "cap");
        assert_eq!(merged[2].size, "L");
    }

    #[test]
    fn quantity_per_key_is_sum_of_both_sides() {
        let cases = vec![
            (vec![], vec![]),
            (vec![item("a", "S", 1)], vec![]),
            (vec![], vec![item("a", "S", 4)]),
            (
                vec![item("a", "S", 1), item("b", "M", 3)],
                vec![item("b", "M", 2), item("c", "L", 5), item("a", "M", 1)],
            ),
            (vec![item("a", "S", 1)], vec![item("a", "S", 1), item("a", "S", 2)]),
        ];

        for (remote, local) in cases {
            let merged = merge_items(&remote, &local);
            let expected = {
                let mut all = remote.clone();
                all.extend(local.clone());
                quantities(&all)
            };

            assert_eq!(quantities(&merged), expected);
            assert_eq!(merged.len(), expected.len(), "no duplicate keys");
        }
    }

    #[test]
    fn color_is_not_part_of_the_key() {
        let mut red = item("tee", "M", 1);
        red.color = Some("red".to_string());
        let mut blue = item("tee", "M", 1);
        blue.color = Some("blue".to_string());

        let merged = merge_items(&[red], &[blue]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].color.as_deref(), Some("red"));
    }

    #[test]
    fn merged_quantity_is_capped() {
        let merged = merge_items(&[item("hoodie", "M", 999)], &[item("hoodie", "M", 1)]);

        assert_eq!(merged[0].quantity, MAX_LINE_QUANTITY);
        assert!(normalize_items(merged).is_ok());
    }

    #[test]
    fn rebase_keeps_upstream_lines_and_current_local_edits() {
        let sent = vec![item("hoodie", "M", 1)];
        // Server already held a cap and merged the hoodie in
        let merged = vec![item("cap", "OS", 2), item("hoodie", "M", 1)];
        // Since then the shopper bumped the hoodie and added a tee
        let local = vec![item("hoodie", "M", 3), item("tee", "L", 1)];

        let rebased_items = rebase_items(&merged, &sent, &local);
        let rebased = line_quantities(&rebased_items);

        assert_eq!(rebased, vec![("cap", 2), ("hoodie", 3), ("tee", 1)]);
    }

    #[test]
    fn rebase_drops_lines_removed_locally() {
        let sent = vec![item("hoodie", "M", 1), item("cap", "OS", 1)];
        let merged = vec![item("hoodie", "M", 2), item("cap", "OS", 1)];
        let local = vec![item("hoodie", "M", 1)];

        let rebased_items = rebase_items(&merged, &sent, &local);
        let rebased = line_quantities(&rebased_items);

        assert_eq!(rebased, vec![("hoodie", 2)]);
    }

    #[test]
    fn rebase_without_local_edits_is_the_merge_result() {
        let sent = vec![item("hoodie", "M", 1)];
        let merged = vec![item("cap", "OS", 1), item("hoodie", "M", 2)];

        assert_eq!(rebase_items(&merged, &sent, &sent), merged);
    }

    fn line_quantities(items: &[LineItem]) -> Vec<(&str, i32)> {
        items
            .iter()
            .map(|i| (i.product_ref.as_str(), i.quantity))
            .collect()
    }

    #[test]
    fn normalize_rejects_zero_quantity() {
        let err = normalize_items(vec![item("hoodie", "M", 0)]).unwrap_err();
        assert!(err.to_string().contains("items[0].quantity"));
    }

    #[test]
    fn normalize_lowercases_product_ref() {
        let items = normalize_items(vec![item(" Hoodie ", "M", 1)]).unwrap();
        assert_eq!(items[0].product_ref, "hoodie");
    }
}
