//! Voucher commands.

use anyhow::{bail, Context as _, Result};
use greens_auth::{Validate, VoucherForm};
use greens_commerce::voucher::VoucherKind;
use greens_commerce::ProductId;
use serde_json::json;

use super::{VoucherArgs, VoucherCommand};
use crate::context::Context;
use crate::output::status_badge;

/// Run the voucher command.
pub async fn run(args: VoucherArgs, ctx: &Context) -> Result<()> {
    match args.command {
        VoucherCommand::Apply {
            code,
            select,
            remote,
        } => apply(&code, &select, remote, ctx).await,
        VoucherCommand::List => list(ctx),
    }
}

async fn apply(code: &str, select: &[String], remote: bool, ctx: &Context) -> Result<()> {
    let code = VoucherForm {
        code: code.to_string(),
    }
    .validate()
    .context("Invalid voucher code")?;

    let store = ctx.store();
    let cart = store.refresh().await.context("Failed to load the cart")?;

    if remote {
        let spinner = ctx.output.spinner(&format!("Applying {code}..."));
        let result = store.apply_voucher_remote(&code).await;
        spinner.finish_and_clear();
        let discount = result.context("Backend rejected the voucher")?;
        let payable = cart.total.try_subtract(&discount)?;

        if ctx.output.is_json() {
            ctx.output.json(&json!({
                "code": code,
                "subtotal": cart.total,
                "discount": discount,
                "payable": payable,
            }));
        } else {
            ctx.output.success(&format!("{code} applied to the whole cart"));
            ctx.output.kv("Subtotal", &cart.total.display());
            ctx.output.kv("Discount", &format!("-{}", discount.display()));
            ctx.output.kv("You pay", &payable.display());
        }
        return Ok(());
    }

    let selected = if select.is_empty() {
        cart.items.clone()
    } else {
        let ids: Vec<ProductId> = select.iter().map(|s| ProductId::new(s.as_str())).collect();
        for id in &ids {
            if cart.get_item(id).is_none() {
                ctx.output.warn(&format!("{id} is not in the cart, skipping"));
            }
        }
        cart.selected(&ids)
    };

    let vouchers = ctx.vouchers()?;
    let spinner = ctx.output.spinner(&format!("Applying {code}..."));
    let result = vouchers.apply(&code, selected).await;
    spinner.finish_and_clear();

    let snapshot = vouchers.snapshot();
    if ctx.output.is_json() {
        ctx.output.json(&snapshot);
    }

    match result {
        Some(Ok(applied)) => {
            if !ctx.output.is_json() {
                ctx.output.success(&format!(
                    "{} {}",
                    applied.code,
                    status_badge(snapshot.status)
                ));
                ctx.output.kv("Subtotal", &applied.subtotal.display());
                ctx.output.kv("Discount", &format!("-{}", applied.discount.display()));
                ctx.output.kv("You pay", &applied.payable()?.display());
            }
            Ok(())
        }
        Some(Err(e)) => bail!("{e}"),
        None => bail!("voucher request was superseded"),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let book = ctx.config.voucher_book()?;

    if ctx.output.is_json() {
        ctx.output.json(&book.rules());
        return Ok(());
    }

    ctx.output.header("Vouchers");
    for rule in book.rules() {
        let description = match &rule.kind {
            VoucherKind::Percentage(percent) => format!("{percent}% off"),
            VoucherKind::FixedAmount(amount) => format!("{} off", amount.display()),
        };
        ctx.output.kv(&rule.code, &description);
    }
    Ok(())
}
