//! User-facing reply text. Pure string building, no I/O.

use crate::command::{DeployCommand, QueryCommand};
use crate::ledger::DeploymentRecord;
use crate::orchestrator::{DeploymentRequest, DeploymentResult, ImageOutcome, Stage};

/// Shown when a value could not be read from the chain.
pub const UNAVAILABLE: &str = "N/A";

/// Sent before any side effect of a deployment.
pub fn processing(command: &DeployCommand, with_image: bool, network: &str) -> String {
    let image = if with_image { " with your image" } else { "" };
    format!(
        "🚀 Deploying token {} ({}){image} on {network}... Please wait!",
        command.token_name, command.token_symbol
    )
}

/// Sent when the logo could not be stored and the deployment continues
/// without it.
pub fn image_failed() -> String {
    "⚠️ Warning: Failed to upload image to IPFS. Deploying token without image...".to_string()
}

pub fn success(command: &DeployCommand, result: &DeploymentResult, image: ImageOutcome) -> String {
    let headline = match image {
        ImageOutcome::Pinned => format!("✅ Token {} deployed successfully with image!", command.token_name),
        ImageOutcome::NotRequested | ImageOutcome::Failed => {
            format!("✅ Token {} deployed successfully!", command.token_name)
        }
    };

    let mut text = format!(
        "{headline}\n\n🔗 Clanker: {}\n📜 Contract: {}\n⛓️ TX: {}",
        result.explorer_link, result.token_address, result.tx_link
    );
    match image {
        ImageOutcome::Pinned => text.push_str("\n🖼️ Image: Uploaded to IPFS"),
        ImageOutcome::Failed => text.push_str("\n🖼️ Image: Not attached (upload failed)"),
        ImageOutcome::NotRequested => {}
    }
    text
}

pub fn failure(reason: &str, handle: &str) -> String {
    let reason = if reason.trim().is_empty() {
        "Unknown error"
    } else {
        reason
    };
    format!("❌ Failed to deploy token: {reason}\n\nTry again or check bot status: @{handle} status")
}

/// Reply to a post that looked like a deploy request but did not parse.
pub fn usage_hint(handle: &str) -> String {
    format!(
        "⚠️ Invalid command format.\n\n✅ Correct usage:\ndeploy token name [NAME] symbol [SYMBOL]\n\nExample:\n@{handle} deploy token name PEPE symbol PEPE\n\nType '@{handle} help' for more info."
    )
}

/// The one terminal reply for a finished request, `None` while it is still
/// in flight.
pub fn final_reply(request: &DeploymentRequest, handle: &str) -> Option<String> {
    match request.stage {
        Stage::Succeeded => request
            .result
            .as_ref()
            .map(|result| success(&request.command, result, request.image_outcome())),
        Stage::Failed => Some(failure(request.error.as_deref().unwrap_or_default(), handle)),
        _ => None,
    }
}

/// Live values a query reply may interpolate.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub handle: String,
    pub wallet: String,
    pub network: String,
    /// Rendered ETH balance, `None` when unavailable.
    pub balance: Option<String>,
    /// Rendered gwei gas price, `None` when unavailable.
    pub gas_price: Option<String>,
    /// Newest-first ledger records.
    pub recent: Vec<DeploymentRecord>,
    pub retained: usize,
    pub total: u64,
    pub wallet_link: String,
}

pub fn query(command: QueryCommand, ctx: &QueryContext) -> String {
    let handle = &ctx.handle;
    let network = &ctx.network;
    let balance = ctx.balance.as_deref().unwrap_or(UNAVAILABLE);
    let gas = ctx.gas_price.as_deref().unwrap_or(UNAVAILABLE);

    match command {
        QueryCommand::Help => format!(
            "👋 Hi! I'm @{handle} - a token deployment bot via Clanker SDK.\n\n\
             Commands:\n\
             • deploy token name [NAME] symbol [SYMBOL] - Deploy ERC-20 token\n\
             • help - Show this message\n\
             • status - Check bot status\n\
             • history - Recent deployments\n\
             • about - Learn about me\n\n\
             💡 Tip: Attach an image for token logo!"
        ),
        QueryCommand::About => format!(
            "🤖 About @{handle}:\n\n\
             I'm an automated token deployment bot powered by Clanker SDK. \
             I help you deploy ERC-20 tokens on {network} instantly!\n\n\
             Features:\n\
             ✅ Deploy tokens in seconds\n\
             ✅ Support custom token logos (IPFS)\n\
             ✅ Automatic liquidity on Uniswap V3\n\
             ✅ No coding required\n\n\
             Built with: Clanker SDK, Neynar API, Pinata IPFS\n\
             Network: {network}"
        ),
        QueryCommand::Status => format!(
            "✅ Status: Online & Ready\n\n\
             💼 Wallet: {}\n\
             ⚡ Balance: {balance} ETH\n\
             ⛽ Gas Price: {gas} gwei\n\
             🔋 Network: {network}\n\
             🖼️ IPFS: Enabled\n\n\
             Total Deployments: {} ({} retained)",
            shorten(&ctx.wallet, 6, 4),
            ctx.total,
            ctx.retained
        ),
        QueryCommand::History => history(ctx),
        QueryCommand::Gas => format!(
            "⛽ Current Gas Price on {network}:\n\n\
             {gas} gwei\n\n\
             Estimated deployment cost: ~0.001 ETH\n\
             Network: {network} (cheap & fast L2)"
        ),
        QueryCommand::Balance => format!(
            "💼 Bot Wallet Info:\n\n\
             Address: {}\n\
             Balance: {balance} ETH\n\
             Network: {network}\n\n\
             View on explorer:\n{}",
            shorten(&ctx.wallet, 10, 8),
            ctx.wallet_link
        ),
        QueryCommand::Protocol => format!(
            "🔧 What is Clanker?\n\n\
             Clanker is a protocol for deploying ERC-20 tokens on {network} with:\n\n\
             ✅ Instant deployment\n\
             ✅ Automatic Uniswap V3 liquidity\n\
             ✅ Fixed max supply (100B tokens)\n\
             ✅ Permanent liquidity lock\n\
             ✅ Creator fee rewards (0.4% volume)\n\n\
             Learn more: https://clanker.world"
        ),
        QueryCommand::HowToDeploy => format!(
            "📝 How to Deploy a Token:\n\n\
             1. Mention me with:\n   @{handle} deploy token name [YOUR_NAME] symbol [SYMBOL]\n\n\
             2. (Optional) Attach an image for token logo\n\n\
             3. Wait 1-2 minutes for deployment\n\n\
             4. Get your Clanker link!\n\n\
             Example:\n@{handle} deploy token name PEPE symbol PEPE\n[Attach: logo.png]"
        ),
        QueryCommand::Pricing => format!(
            "💰 Deployment Cost:\n\n\
             Gas Fee: ~0.001 ETH (~$2-3)\n\
             Bot Fee: FREE\n\
             Network: {network} (cheap L2)\n\n\
             You only pay blockchain gas fees!\n\n\
             Note: I need ETH in my wallet for deployment. Make sure to have sufficient balance."
        ),
        QueryCommand::Unknown => format!(
            "🤔 I didn't understand that command.\n\n\
             Try:\n\
             • help - Show available commands\n\
             • deploy token name X symbol Y - Deploy a token\n\
             • status - Check bot status\n\n\
             Need help? Type: @{handle} help"
        ),
    }
}

fn history(ctx: &QueryContext) -> String {
    if ctx.recent.is_empty() {
        return "📊 Deployment History:\n\nNo tokens deployed yet. Be the first!\n\n\
                Use: deploy token name [NAME] symbol [SYMBOL]"
            .to_string();
    }

    let mut text = String::from("📊 Recent Deployments:\n\n");
    for (index, record) in ctx.recent.iter().take(5).enumerate() {
        let marker = if record.has_image { " 🖼️" } else { "" };
        text.push_str(&format!(
            "{}. {} ({}){marker}\n   {}\n",
            index + 1,
            record.token_name,
            record.token_symbol,
            shorten(&record.token_address, 8, 6)
        ));
    }
    text.push_str(&format!("\nTotal: {} tokens deployed", ctx.total));
    text
}

/// `0x1234...abcd` style abbreviation. Short values pass through.
pub fn shorten(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return value.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{start}...{end}")
}
