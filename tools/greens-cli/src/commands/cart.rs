//! Cart commands.

use std::collections::BTreeSet;

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use greens_commerce::{Cart, CartItem, Money, ProductId};

use super::{CartArgs, CartCommand};
use crate::context::Context;
use crate::output::truncate;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    store.refresh().await.context("Failed to load the cart")?;

    let cart = match args.command.unwrap_or(CartCommand::Show) {
        CartCommand::Show => store.snapshot(),
        CartCommand::Add {
            id,
            name,
            price,
            qty,
            color,
            size,
            image,
        } => {
            let price = Money::from_decimal(price, ctx.config.api.currency)?;
            let mut item = CartItem::new(id.as_str(), name, price, qty)?;
            item.color = color;
            item.size = size;
            item.image = image;

            let cart = store.add(item).await.context("Failed to add to cart")?;
            ctx.output.success(&format!("Added {id}"));
            cart
        }
        CartCommand::Remove { id } => {
            let cart = store
                .remove(&ProductId::new(id.as_str()))
                .await
                .context("Failed to remove from cart")?;
            ctx.output.success(&format!("Removed {id}"));
            cart
        }
        CartCommand::Update { id, qty } => {
            let cart = store
                .update_quantity(&ProductId::new(id.as_str()), qty)
                .await
                .context("Failed to update quantity")?;
            ctx.output.success(&format!("{id} now has quantity {qty}"));
            cart
        }
        CartCommand::Clear { yes } => clear(&store.snapshot(), yes, ctx).await?,
    };

    ctx.persist()?;
    print_cart(&cart, ctx);
    Ok(())
}

/// The backend has no clear endpoint, so every line is removed one by one.
async fn clear(cart: &Cart, yes: bool, ctx: &Context) -> Result<Cart> {
    if cart.is_empty() {
        ctx.output.info("Cart is already empty");
        return Ok(cart.clone());
    }

    if !yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove all {} items from the cart?", cart.item_count()))
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.output.info("Cancelled");
            return Ok(cart.clone());
        }
    }

    let store = ctx.store();
    let ids: BTreeSet<&ProductId> = cart.items.iter().map(|i| &i.id).collect();
    for id in ids {
        store
            .remove(id)
            .await
            .with_context(|| format!("Failed to remove {id}"))?;
    }
    store.clear();
    ctx.output.success("Cart cleared");
    Ok(store.snapshot())
}

pub(crate) fn print_cart(cart: &Cart, ctx: &Context) {
    if ctx.output.is_json() {
        ctx.output.json(cart);
        return;
    }

    ctx.output.header("Cart");
    if cart.is_empty() {
        ctx.output.info("Your cart is empty");
        return;
    }

    let widths = [12, 24, 10, 5, 12];
    ctx.output
        .table_row(&["ID", "ITEM", "PRICE", "QTY", "TOTAL"], &widths);
    for item in &cart.items {
        let mut name = item.name.clone();
        let variant: Vec<&str> = [item.color.as_deref(), item.size.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !variant.is_empty() {
            name = format!("{name} ({})", variant.join(", "));
        }
        ctx.output.table_row(
            &[
                &truncate(item.id.as_str(), 12),
                &truncate(&name, 24),
                &item.unit_price.display(),
                &item.quantity.to_string(),
                &item.line_total.display(),
            ],
            &widths,
        );
    }
    println!();
    ctx.output.kv("Items", &cart.item_count().to_string());
    ctx.output.kv("Total", &cart.total.display());
}
