//! Order history and the seller dashboard.

use anyhow::{Context as _, Result};
use greens_auth::Role;
use greens_commerce::orders::monthly_revenue;
use greens_commerce::OrderStats;
use serde_json::json;

use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(OrdersCommand::List { limit: None }) {
        OrdersCommand::List { limit } => list(limit, ctx).await,
        OrdersCommand::Stats => stats(ctx).await,
    }
}

async fn list(limit: Option<usize>, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let mut orders = store.orders().await.context("Failed to load orders")?;
    orders.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = limit {
        orders.truncate(limit);
    }

    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return Ok(());
    }

    ctx.output.header("Orders");
    if orders.is_empty() {
        ctx.output.info("No orders yet");
        return Ok(());
    }

    let widths = [14, 12, 12];
    ctx.output.table_row(&["ORDER", "DATE", "AMOUNT"], &widths);
    for order in &orders {
        ctx.output.table_row(
            &[
                order.id.as_str(),
                &order.date.format("%Y-%m-%d").to_string(),
                &order.amount.display(),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn stats(ctx: &Context) -> Result<()> {
    let seller = ctx
        .session
        .require_role(Role::Seller)
        .context("The dashboard is for sellers")?;
    ctx.output.debug(&format!("dashboard for {}", seller.email));

    let currency = ctx.config.api.currency;
    let orders = ctx
        .store()
        .orders()
        .await
        .context("Failed to load orders")?;
    let stats = OrderStats::from_orders(&orders, currency)?;
    let months = monthly_revenue(&orders, currency)?;

    if ctx.output.is_json() {
        let monthly: Vec<_> = months
            .iter()
            .map(|((year, month), revenue)| {
                json!({ "month": format!("{year}-{month:02}"), "revenue": revenue })
            })
            .collect();
        ctx.output.json(&json!({ "stats": stats, "monthly": monthly }));
        return Ok(());
    }

    ctx.output.header(&format!("Dashboard: {}", seller.name));
    ctx.output.kv("Orders", &stats.order_count.to_string());
    ctx.output.kv("Revenue", &stats.revenue.display());
    ctx.output.kv("Average order", &stats.average_order.display());
    if let (Some(first), Some(last)) = (stats.first_order, stats.last_order) {
        ctx.output.kv("Period", &format!("{first} to {last}"));
    }

    if !months.is_empty() {
        println!();
        for ((year, month), revenue) in &months {
            ctx.output
                .list_item(&format!("{year}-{month:02}  {}", revenue.display()));
        }
    }
    Ok(())
}
