//! Conversational Telegram flows.
//!
//! Implements the intake wizard (`/add`), the single-field edit flow
//! (`/edit`) and the watchlist view (`/view`) as a state machine over plain
//! text messages. [`TelegramFlow::handle_message`] is the whole brain: it
//! takes the sender and the message text and returns the reply, so every
//! conversation path is unit-testable without a live bot.
//!
//! Only one operator is allowed; anyone else gets a refusal. A single
//! conversation state is kept, which matches the one-operator model.

use std::sync::Arc;

use rust_decimal::Decimal;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{BuyZone, LiquidityFlags, NewTokenWatch, TaxRates, WatchField, WatchId};
use crate::port::{QuoteSource, WatchStore};

use super::command::{bot_commands, command_help, parse_command, TelegramCommand};
use super::format::{market_cap_text, money, yes_no};

/// Intake wizard steps, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntakeStep {
    Name,
    Contract,
    ZoneLow,
    ZoneHigh,
    Chain,
    Locked,
    Renounced,
    Burned,
    BuyTax,
    SellTax,
    TransferTax,
}

/// Partially collected intake answers.
#[derive(Debug, Clone, Default)]
struct WatchDraft {
    name: Option<String>,
    contract_address: Option<String>,
    chain: Option<String>,
    zone_low: Option<Decimal>,
    zone_high: Option<Decimal>,
    locked: Option<bool>,
    renounced: Option<bool>,
    burned: Option<bool>,
    buy_tax: Option<Decimal>,
    sell_tax: Option<Decimal>,
    transfer_tax: Option<Decimal>,
}

impl WatchDraft {
    /// Assemble the intake payload once every answer is in.
    ///
    /// Each answer was validated at its own step, so this only fails if a
    /// step was skipped, which the wizard never does.
    fn build(&self) -> Option<NewTokenWatch> {
        let buy_zone = BuyZone::new(self.zone_low?, self.zone_high?).ok()?;
        let taxes = TaxRates::new(self.buy_tax?, self.sell_tax?, self.transfer_tax?).ok()?;

        Some(NewTokenWatch {
            name: self.name.clone()?,
            contract_address: self.contract_address.clone()?,
            chain: self.chain.clone()?,
            liquidity: LiquidityFlags {
                locked: self.locked?,
                ownership_renounced: self.renounced?,
                burned: self.burned?,
            },
            taxes,
            buy_zone,
        })
    }
}

/// Editable fields, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSlot {
    Name,
    Chain,
    Locked,
    Renounced,
    Burned,
    BuyTax,
    SellTax,
    TransferTax,
    ZoneLow,
    ZoneHigh,
}

impl FieldSlot {
    const ALL: [FieldSlot; 10] = [
        FieldSlot::Name,
        FieldSlot::Chain,
        FieldSlot::Locked,
        FieldSlot::Renounced,
        FieldSlot::Burned,
        FieldSlot::BuyTax,
        FieldSlot::SellTax,
        FieldSlot::TransferTax,
        FieldSlot::ZoneLow,
        FieldSlot::ZoneHigh,
    ];

    fn label(self) -> &'static str {
        match self {
            FieldSlot::Name => "Name",
            FieldSlot::Chain => "Chain",
            FieldSlot::Locked => "Liquidity Locked",
            FieldSlot::Renounced => "Ownership Renounced",
            FieldSlot::Burned => "Liquidity Burned",
            FieldSlot::BuyTax => "Buy Tax",
            FieldSlot::SellTax => "Sell Tax",
            FieldSlot::TransferTax => "Transfer Tax",
            FieldSlot::ZoneLow => "Buy Zone Low",
            FieldSlot::ZoneHigh => "Buy Zone High",
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            FieldSlot::Name => "What's the new name?",
            FieldSlot::Chain => "What's the new chain?",
            FieldSlot::Locked => "Is the liquidity locked? (yes/no)",
            FieldSlot::Renounced => "Is the ownership renounced? (yes/no)",
            FieldSlot::Burned => "Is the liquidity burned? (yes/no)",
            FieldSlot::BuyTax => "What's the new buy tax (%)?",
            FieldSlot::SellTax => "What's the new sell tax (%)?",
            FieldSlot::TransferTax => "What's the new transfer tax (%)?",
            FieldSlot::ZoneLow => "What's the new lower bound of the buy zone, in USD?",
            FieldSlot::ZoneHigh => "What's the new upper bound of the buy zone, in USD?",
        }
    }

    fn invalid_reply(self) -> &'static str {
        match self {
            FieldSlot::Name | FieldSlot::Chain => "That can't be empty. Try again.",
            FieldSlot::Locked | FieldSlot::Renounced | FieldSlot::Burned => {
                "Please answer yes or no."
            }
            FieldSlot::BuyTax
            | FieldSlot::SellTax
            | FieldSlot::TransferTax
            | FieldSlot::ZoneLow
            | FieldSlot::ZoneHigh => "That doesn't look like a non-negative number. Try again.",
        }
    }

    fn parse(self, text: &str) -> Option<WatchField> {
        match self {
            FieldSlot::Name => {
                (!text.is_empty()).then(|| WatchField::Name(text.to_string()))
            }
            FieldSlot::Chain => {
                (!text.is_empty()).then(|| WatchField::Chain(text.to_string()))
            }
            FieldSlot::Locked => parse_yes_no(text).map(WatchField::LiquidityLocked),
            FieldSlot::Renounced => parse_yes_no(text).map(WatchField::OwnershipRenounced),
            FieldSlot::Burned => parse_yes_no(text).map(WatchField::LiquidityBurned),
            FieldSlot::BuyTax => parse_percent(text).map(WatchField::BuyTax),
            FieldSlot::SellTax => parse_percent(text).map(WatchField::SellTax),
            FieldSlot::TransferTax => parse_percent(text).map(WatchField::TransferTax),
            FieldSlot::ZoneLow => parse_money(text).map(WatchField::ZoneLow),
            FieldSlot::ZoneHigh => parse_money(text).map(WatchField::ZoneHigh),
        }
    }
}

/// Where the single operator conversation currently stands.
#[derive(Debug, Clone, Default)]
enum FlowState {
    #[default]
    Idle,
    Intake {
        step: IntakeStep,
        draft: WatchDraft,
    },
    IntakeConfirm {
        watch: NewTokenWatch,
    },
    EditSelectWatch {
        options: Vec<(WatchId, String)>,
    },
    EditSelectField {
        id: WatchId,
        name: String,
    },
    EditValue {
        id: WatchId,
        name: String,
        slot: FieldSlot,
    },
    EditConfirm {
        id: WatchId,
        name: String,
        field: WatchField,
    },
}

/// Conversation handler for the operator chat.
pub struct TelegramFlow<S, Q> {
    store: Arc<S>,
    quotes: Arc<Q>,
    allowed_user_id: u64,
    state: Mutex<FlowState>,
}

impl<S, Q> TelegramFlow<S, Q>
where
    S: WatchStore,
    Q: QuoteSource,
{
    #[must_use]
    pub fn new(store: Arc<S>, quotes: Arc<Q>, allowed_user_id: u64) -> Self {
        Self {
            store,
            quotes,
            allowed_user_id,
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// Handle one inbound message and produce the reply, if any.
    ///
    /// Messages without a sender (channel posts) are ignored; messages from
    /// anyone but the configured operator get a refusal.
    pub async fn handle_message(&self, user_id: Option<u64>, text: &str) -> Option<String> {
        let user_id = user_id?;
        if user_id != self.allowed_user_id {
            warn!(user_id, "Rejected Telegram message from unknown user");
            return Some("⛔ This bot only answers to its configured operator.".to_string());
        }

        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut state = self.state.lock().await;
        let reply = if text.starts_with('/') {
            self.dispatch_command(&mut state, text).await
        } else {
            self.advance(&mut state, text).await
        };

        Some(reply)
    }

    async fn dispatch_command(&self, state: &mut FlowState, text: &str) -> String {
        match parse_command(text) {
            Ok(TelegramCommand::Start | TelegramCommand::Help) => command_help().to_string(),
            Ok(TelegramCommand::Cancel) => {
                *state = FlowState::Idle;
                "Operation cancelled.".to_string()
            }
            Ok(TelegramCommand::View) => self.render_watchlist().await,
            Ok(TelegramCommand::Add | TelegramCommand::Edit)
                if !matches!(*state, FlowState::Idle) =>
            {
                "Another operation is in progress. Finish it or /cancel first.".to_string()
            }
            Ok(TelegramCommand::Add) => {
                *state = FlowState::Intake {
                    step: IntakeStep::Name,
                    draft: WatchDraft::default(),
                };
                "Let's add a new token! What's the token name?".to_string()
            }
            Ok(TelegramCommand::Edit) => self.start_edit(state).await,
            Err(e) => format!("{e}. Use /help to see what I understand."),
        }
    }

    async fn advance(&self, state: &mut FlowState, text: &str) -> String {
        match std::mem::take(state) {
            FlowState::Idle => {
                "I wasn't expecting that. Use /help to see the commands.".to_string()
            }
            FlowState::Intake { step, draft } => {
                self.advance_intake(state, step, draft, text)
            }
            FlowState::IntakeConfirm { watch } => match parse_yes_no(text) {
                Some(true) => match self.store.insert(&watch).await {
                    Ok(saved) => {
                        info!(
                            id = saved.id,
                            name = %saved.name,
                            contract = %saved.contract_address,
                            "Watch added"
                        );
                        format!(
                            "✅ {} added to the watchlist. The next scan will announce it.",
                            saved.name
                        )
                    }
                    Err(e) => format!("❌ Could not save the watch: {e}"),
                },
                Some(false) => "Discarded. Nothing was saved.".to_string(),
                None => {
                    *state = FlowState::IntakeConfirm { watch };
                    "Please answer yes or no.".to_string()
                }
            },
            FlowState::EditSelectWatch { options } => {
                let selection = text
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| options.get(i))
                    .cloned();
                match selection {
                    Some((id, name)) => {
                        let menu = field_menu(&name);
                        *state = FlowState::EditSelectField { id, name };
                        menu
                    }
                    None => {
                        *state = FlowState::EditSelectWatch { options };
                        "Reply with one of the listed numbers.".to_string()
                    }
                }
            }
            FlowState::EditSelectField { id, name } => {
                let slot = text
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| FieldSlot::ALL.get(i))
                    .copied();
                match slot {
                    Some(slot) => {
                        *state = FlowState::EditValue { id, name, slot };
                        slot.prompt().to_string()
                    }
                    None => {
                        *state = FlowState::EditSelectField { id, name };
                        "Reply with one of the listed numbers.".to_string()
                    }
                }
            }
            FlowState::EditValue { id, name, slot } => {
                self.receive_edit_value(state, id, name, slot, text).await
            }
            FlowState::EditConfirm { id, name, field } => match parse_yes_no(text) {
                Some(true) => match self.store.update_field(id, &field).await {
                    Ok(()) => {
                        info!(id, field = field.label(), "Watch updated");
                        format!("✅ Updated {} for {}.", field.label(), name)
                    }
                    Err(e) => format!("❌ Could not update the watch: {e}"),
                },
                Some(false) => "Discarded. Nothing was changed.".to_string(),
                None => {
                    *state = FlowState::EditConfirm { id, name, field };
                    "Please answer yes or no.".to_string()
                }
            },
        }
    }

    fn advance_intake(
        &self,
        state: &mut FlowState,
        step: IntakeStep,
        mut draft: WatchDraft,
        text: &str,
    ) -> String {
        let reprompt = |state: &mut FlowState, draft: WatchDraft, reply: String| {
            *state = FlowState::Intake { step, draft };
            reply
        };

        match step {
            IntakeStep::Name => {
                draft.name = Some(text.to_string());
                *state = FlowState::Intake {
                    step: IntakeStep::Contract,
                    draft,
                };
                "Got it! What's the contract address?".to_string()
            }
            IntakeStep::Contract => {
                if text.split_whitespace().count() != 1 {
                    return reprompt(
                        state,
                        draft,
                        "A contract address can't contain spaces. Try again.".to_string(),
                    );
                }
                draft.contract_address = Some(text.to_string());
                *state = FlowState::Intake {
                    step: IntakeStep::ZoneLow,
                    draft,
                };
                "What's the lower bound of the buy zone, in USD market cap?".to_string()
            }
            IntakeStep::ZoneLow => match parse_money(text) {
                Some(low) => {
                    draft.zone_low = Some(low);
                    *state = FlowState::Intake {
                        step: IntakeStep::ZoneHigh,
                        draft,
                    };
                    "And the upper bound?".to_string()
                }
                None => reprompt(
                    state,
                    draft,
                    "That doesn't look like a non-negative number. Try again.".to_string(),
                ),
            },
            IntakeStep::ZoneHigh => {
                let Some(low) = draft.zone_low else {
                    return "❌ The draft got out of step; start over with /add.".to_string();
                };
                match parse_money(text) {
                    Some(high) => match BuyZone::new(low, high) {
                        Ok(_) => {
                            draft.zone_high = Some(high);
                            *state = FlowState::Intake {
                                step: IntakeStep::Chain,
                                draft,
                            };
                            "Which chain is the token on?".to_string()
                        }
                        Err(e) => reprompt(state, draft, format!("{e}. Try again.")),
                    },
                    None => reprompt(
                        state,
                        draft,
                        "That doesn't look like a non-negative number. Try again.".to_string(),
                    ),
                }
            }
            IntakeStep::Chain => {
                draft.chain = Some(text.to_string());
                *state = FlowState::Intake {
                    step: IntakeStep::Locked,
                    draft,
                };
                "Is the liquidity locked? (yes/no)".to_string()
            }
            IntakeStep::Locked => match parse_yes_no(text) {
                Some(locked) => {
                    draft.locked = Some(locked);
                    *state = FlowState::Intake {
                        step: IntakeStep::Renounced,
                        draft,
                    };
                    "Is the ownership renounced? (yes/no)".to_string()
                }
                None => reprompt(state, draft, "Please answer yes or no.".to_string()),
            },
            IntakeStep::Renounced => match parse_yes_no(text) {
                Some(renounced) => {
                    draft.renounced = Some(renounced);
                    *state = FlowState::Intake {
                        step: IntakeStep::Burned,
                        draft,
                    };
                    "Is the liquidity burned? (yes/no)".to_string()
                }
                None => reprompt(state, draft, "Please answer yes or no.".to_string()),
            },
            IntakeStep::Burned => match parse_yes_no(text) {
                Some(burned) => {
                    draft.burned = Some(burned);
                    *state = FlowState::Intake {
                        step: IntakeStep::BuyTax,
                        draft,
                    };
                    "What's the buy tax (%)?".to_string()
                }
                None => reprompt(state, draft, "Please answer yes or no.".to_string()),
            },
            IntakeStep::BuyTax => match parse_percent(text) {
                Some(tax) => {
                    draft.buy_tax = Some(tax);
                    *state = FlowState::Intake {
                        step: IntakeStep::SellTax,
                        draft,
                    };
                    "What's the sell tax (%)?".to_string()
                }
                None => reprompt(
                    state,
                    draft,
                    "That doesn't look like a non-negative number. Try again.".to_string(),
                ),
            },
            IntakeStep::SellTax => match parse_percent(text) {
                Some(tax) => {
                    draft.sell_tax = Some(tax);
                    *state = FlowState::Intake {
                        step: IntakeStep::TransferTax,
                        draft,
                    };
                    "What's the transfer tax (%)?".to_string()
                }
                None => reprompt(
                    state,
                    draft,
                    "That doesn't look like a non-negative number. Try again.".to_string(),
                ),
            },
            IntakeStep::TransferTax => match parse_percent(text) {
                Some(tax) => {
                    draft.transfer_tax = Some(tax);
                    match draft.build() {
                        Some(watch) => {
                            let summary = intake_summary(&watch);
                            *state = FlowState::IntakeConfirm { watch };
                            summary
                        }
                        None => "❌ The draft got out of step; start over with /add.".to_string(),
                    }
                }
                None => reprompt(
                    state,
                    draft,
                    "That doesn't look like a non-negative number. Try again.".to_string(),
                ),
            },
        }
    }

    async fn receive_edit_value(
        &self,
        state: &mut FlowState,
        id: WatchId,
        name: String,
        slot: FieldSlot,
        text: &str,
    ) -> String {
        let Some(field) = slot.parse(text) else {
            let reply = slot.invalid_reply().to_string();
            *state = FlowState::EditValue { id, name, slot };
            return reply;
        };

        // Replacing one zone bound must not invert the zone against the
        // bound that stays.
        let zone_change = match &field {
            WatchField::ZoneLow(v) => Some((Some(*v), None)),
            WatchField::ZoneHigh(v) => Some((None, Some(*v))),
            _ => None,
        };
        if let Some((new_low, new_high)) = zone_change {
            let watch = match self.store.get(id).await {
                Ok(Some(watch)) => watch,
                Ok(None) => return "❌ That watch no longer exists.".to_string(),
                Err(e) => return format!("❌ Could not read the watch: {e}"),
            };
            let low = new_low.unwrap_or_else(|| watch.buy_zone.low());
            let high = new_high.unwrap_or_else(|| watch.buy_zone.high());
            if let Err(e) = BuyZone::new(low, high) {
                *state = FlowState::EditValue { id, name, slot };
                return format!("{e}. Try another value.");
            }
        }

        let summary = format!(
            "Set {} of {} to {}? (yes/no)",
            field.label(),
            name,
            field_value_text(&field)
        );
        *state = FlowState::EditConfirm { id, name, field };
        summary
    }

    async fn start_edit(&self, state: &mut FlowState) -> String {
        match self.store.list_all().await {
            Err(e) => format!("❌ Could not read the watchlist: {e}"),
            Ok(watches) if watches.is_empty() => {
                "The watchlist is empty. Use /add to register a token.".to_string()
            }
            Ok(watches) => {
                let options: Vec<(WatchId, String)> = watches
                    .iter()
                    .map(|watch| (watch.id, watch.name.clone()))
                    .collect();

                let mut menu = String::from("Which token do you want to edit?\n");
                for (i, (_, name)) in options.iter().enumerate() {
                    menu.push_str(&format!("{}. {}\n", i + 1, name));
                }
                menu.push_str("\nReply with the number.");

                *state = FlowState::EditSelectWatch { options };
                menu
            }
        }
    }

    async fn render_watchlist(&self) -> String {
        let watches = match self.store.list_all().await {
            Ok(watches) => watches,
            Err(e) => return format!("❌ Could not read the watchlist: {e}"),
        };
        if watches.is_empty() {
            return "The watchlist is empty. Use /add to register a token.".to_string();
        }

        let mut out = format!("📊 Watchlist ({} tokens)\n", watches.len());
        for watch in watches {
            let quote = self.quotes.market_cap(&watch.contract_address).await;
            out.push_str(&format!(
                "\n{} ({})\n  Cap: {} | Zone: {} - {}\n  Anchor: {} | Last multiple: {}x\n",
                watch.name,
                watch.chain,
                market_cap_text(quote.market_cap()),
                money(watch.buy_zone.low()),
                money(watch.buy_zone.high()),
                market_cap_text(watch.initial_market_cap),
                watch.last_notified_multiple,
            ));
        }
        out
    }
}

fn field_menu(name: &str) -> String {
    let mut menu = format!("Which field of {name} do you want to change?\n");
    for (i, slot) in FieldSlot::ALL.iter().enumerate() {
        menu.push_str(&format!("{}. {}\n", i + 1, slot.label()));
    }
    menu.push_str("\nReply with the number.");
    menu
}

fn intake_summary(watch: &NewTokenWatch) -> String {
    format!(
        "Here's what I have:\n\n\
        📝 Name: {}\n\
        🔗 Contract: {}\n\
        🌐 Chain: {}\n\
        📈 Buy Zone: {} - {}\n\
        🔐 Liquidity Locked: {}\n\
        🔏 Ownership Renounced: {}\n\
        🔥 Liquidity Burned: {}\n\
        💰 Buy Tax: {}%\n\
        💸 Sell Tax: {}%\n\
        💼 Transfer Tax: {}%\n\n\
        Save this watch? (yes/no)",
        watch.name,
        watch.contract_address,
        watch.chain,
        money(watch.buy_zone.low()),
        money(watch.buy_zone.high()),
        yes_no(watch.liquidity.locked),
        yes_no(watch.liquidity.ownership_renounced),
        yes_no(watch.liquidity.burned),
        watch.taxes.buy,
        watch.taxes.sell,
        watch.taxes.transfer,
    )
}

fn field_value_text(field: &WatchField) -> String {
    match field {
        WatchField::Name(v) | WatchField::Chain(v) => v.clone(),
        WatchField::LiquidityLocked(v)
        | WatchField::OwnershipRenounced(v)
        | WatchField::LiquidityBurned(v) => yes_no(*v).to_string(),
        WatchField::BuyTax(v) | WatchField::SellTax(v) | WatchField::TransferTax(v) => {
            format!("{v}%")
        }
        WatchField::ZoneLow(v) | WatchField::ZoneHigh(v) => money(*v),
    }
}

fn parse_yes_no(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

fn parse_money(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().trim_start_matches('$').replace(',', "");
    let value = cleaned.parse::<Decimal>().ok()?;
    (!value.is_sign_negative()).then_some(value)
}

fn parse_percent(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().trim_end_matches('%').trim();
    let value = cleaned.parse::<Decimal>().ok()?;
    (!value.is_sign_negative()).then_some(value)
}

/// Run the inbound Telegram message loop until the process shuts down.
pub async fn command_listener<S, Q>(bot: Bot, flow: Arc<TelegramFlow<S, Q>>)
where
    S: WatchStore + 'static,
    Q: QuoteSource + 'static,
{
    // Register commands with Telegram so they appear in the "/" menu
    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "Failed to register bot commands with Telegram");
    }

    info!("Telegram command listener started");

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let flow = flow.clone();
        async move {
            let Some(text) = msg.text() else {
                return respond(());
            };
            let user_id = msg.from.as_ref().map(|user| user.id.0);

            if let Some(reply) = flow.handle_message(user_id, text).await {
                if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                    error!(error = %e, "Failed to send Telegram reply");
                }
            }

            respond(())
        }
    })
    .await;
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| BotCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quote, TokenWatch};
    use crate::error::{Error, Result};
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicI32, Ordering};

    const OPERATOR: u64 = 42;

    /// In-memory store fake for driving conversations.
    #[derive(Default)]
    struct MemoryStore {
        watches: std::sync::Mutex<Vec<TokenWatch>>,
        next_id: AtomicI32,
    }

    impl MemoryStore {
        fn snapshot(&self) -> Vec<TokenWatch> {
            self.watches.lock().unwrap().clone()
        }

        fn seed(&self, watch: TokenWatch) {
            self.watches.lock().unwrap().push(watch);
        }
    }

    impl WatchStore for MemoryStore {
        async fn insert(&self, new: &NewTokenWatch) -> Result<TokenWatch> {
            let mut watches = self.watches.lock().unwrap();
            if watches
                .iter()
                .any(|w| w.contract_address == new.contract_address)
            {
                return Err(Error::Database("contract address already watched".into()));
            }
            let watch = TokenWatch {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                name: new.name.clone(),
                contract_address: new.contract_address.clone(),
                chain: new.chain.clone(),
                liquidity: new.liquidity,
                taxes: new.taxes,
                buy_zone: new.buy_zone,
                initial_market_cap: None,
                notified_at: None,
                last_notified_multiple: 1,
                created_at: Utc::now(),
            };
            watches.push(watch.clone());
            Ok(watch)
        }

        async fn get(&self, id: WatchId) -> Result<Option<TokenWatch>> {
            Ok(self
                .watches
                .lock()
                .unwrap()
                .iter()
                .find(|w| w.id == id)
                .cloned())
        }

        async fn list_all(&self) -> Result<Vec<TokenWatch>> {
            Ok(self.snapshot())
        }

        async fn list_unnotified(&self) -> Result<Vec<TokenWatch>> {
            Ok(self
                .snapshot()
                .into_iter()
                .filter(|w| w.notified_at.is_none())
                .collect())
        }

        async fn mark_notified(&self, id: WatchId, at: DateTime<Utc>) -> Result<()> {
            let mut watches = self.watches.lock().unwrap();
            if let Some(w) = watches.iter_mut().find(|w| w.id == id) {
                w.notified_at.get_or_insert(at);
            }
            Ok(())
        }

        async fn anchor(&self, id: WatchId, market_cap: Decimal, at: DateTime<Utc>) -> Result<()> {
            let mut watches = self.watches.lock().unwrap();
            if let Some(w) = watches.iter_mut().find(|w| w.id == id) {
                if w.initial_market_cap.is_none() {
                    w.initial_market_cap = Some(market_cap);
                    w.notified_at = Some(at);
                }
            }
            Ok(())
        }

        async fn set_last_multiple(&self, id: WatchId, multiple: u32) -> Result<()> {
            let mut watches = self.watches.lock().unwrap();
            if let Some(w) = watches.iter_mut().find(|w| w.id == id) {
                if multiple > w.last_notified_multiple {
                    w.last_notified_multiple = multiple;
                }
            }
            Ok(())
        }

        async fn update_field(&self, id: WatchId, field: &WatchField) -> Result<()> {
            let mut watches = self.watches.lock().unwrap();
            let Some(w) = watches.iter_mut().find(|w| w.id == id) else {
                return Err(Error::Database(format!("no watch with id {id}")));
            };
            match field {
                WatchField::Name(v) => w.name = v.clone(),
                WatchField::Chain(v) => w.chain = v.clone(),
                WatchField::LiquidityLocked(v) => w.liquidity.locked = *v,
                WatchField::OwnershipRenounced(v) => w.liquidity.ownership_renounced = *v,
                WatchField::LiquidityBurned(v) => w.liquidity.burned = *v,
                WatchField::BuyTax(v) => w.taxes.buy = *v,
                WatchField::SellTax(v) => w.taxes.sell = *v,
                WatchField::TransferTax(v) => w.taxes.transfer = *v,
                WatchField::ZoneLow(v) => {
                    w.buy_zone = BuyZone::new(*v, w.buy_zone.high()).map_err(Error::Domain)?;
                }
                WatchField::ZoneHigh(v) => {
                    w.buy_zone = BuyZone::new(w.buy_zone.low(), *v).map_err(Error::Domain)?;
                }
            }
            Ok(())
        }
    }

    /// Quote source fake returning a fixed cap.
    struct FixedQuotes(Option<Decimal>);

    impl QuoteSource for FixedQuotes {
        async fn market_cap(&self, _contract_address: &str) -> Quote {
            Quote::from(self.0)
        }
    }

    fn flow_with(
        cap: Option<Decimal>,
    ) -> (Arc<MemoryStore>, TelegramFlow<MemoryStore, FixedQuotes>) {
        let store = Arc::new(MemoryStore::default());
        let flow = TelegramFlow::new(store.clone(), Arc::new(FixedQuotes(cap)), OPERATOR);
        (store, flow)
    }

    fn seeded_watch(id: WatchId, name: &str, contract: &str) -> TokenWatch {
        TokenWatch {
            id,
            name: name.to_string(),
            contract_address: contract.to_string(),
            chain: "Ethereum".to_string(),
            liquidity: LiquidityFlags {
                locked: true,
                ownership_renounced: false,
                burned: false,
            },
            taxes: TaxRates::new(dec!(1), dec!(1), dec!(0)).unwrap(),
            buy_zone: BuyZone::new(dec!(900), dec!(1100)).unwrap(),
            initial_market_cap: None,
            notified_at: None,
            last_notified_multiple: 1,
            created_at: Utc::now(),
        }
    }

    async fn say(flow: &TelegramFlow<MemoryStore, FixedQuotes>, text: &str) -> String {
        flow.handle_message(Some(OPERATOR), text)
            .await
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unknown_user_is_refused() {
        let (store, flow) = flow_with(None);

        let reply = flow.handle_message(Some(7), "/add").await.unwrap();

        assert!(reply.contains("operator"));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn messages_without_sender_are_ignored() {
        let (_, flow) = flow_with(None);
        assert!(flow.handle_message(None, "/add").await.is_none());
    }

    #[tokio::test]
    async fn full_intake_saves_a_watch() {
        let (store, flow) = flow_with(None);

        say(&flow, "/add").await;
        say(&flow, "Pepe 2.0").await;
        say(&flow, "0xabc123").await;
        say(&flow, "900").await;
        say(&flow, "1,100").await;
        say(&flow, "Ethereum").await;
        say(&flow, "yes").await;
        say(&flow, "no").await;
        say(&flow, "y").await;
        say(&flow, "2.5").await;
        let summary = say(&flow, "3%").await;
        assert!(summary.contains("transfer tax"));
        let summary = say(&flow, "0").await;
        assert!(summary.contains("Pepe 2.0"));
        assert!(summary.contains("$900.00 - $1,100.00"));

        let reply = say(&flow, "yes").await;
        assert!(reply.starts_with("✅"));

        let watches = store.snapshot();
        assert_eq!(watches.len(), 1);
        let watch = &watches[0];
        assert_eq!(watch.name, "Pepe 2.0");
        assert_eq!(watch.contract_address, "0xabc123");
        assert_eq!(watch.chain, "Ethereum");
        assert!(watch.liquidity.locked);
        assert!(!watch.liquidity.ownership_renounced);
        assert!(watch.liquidity.burned);
        assert_eq!(watch.taxes.buy, dec!(2.5));
        assert_eq!(watch.taxes.sell, dec!(3));
        assert_eq!(watch.taxes.transfer, dec!(0));
        assert_eq!(watch.buy_zone.low(), dec!(900));
        assert_eq!(watch.buy_zone.high(), dec!(1100));
        assert!(watch.notified_at.is_none());
        assert!(watch.initial_market_cap.is_none());
    }

    #[tokio::test]
    async fn invalid_answers_reprompt_without_losing_progress() {
        let (store, flow) = flow_with(None);

        say(&flow, "/add").await;
        say(&flow, "Pepe").await;
        say(&flow, "0xabc").await;

        let reply = say(&flow, "not-a-number").await;
        assert!(reply.contains("Try again"));
        say(&flow, "900").await;

        let reply = say(&flow, "100").await;
        assert!(reply.contains("Try again")); // inverted zone
        say(&flow, "1100").await;

        say(&flow, "Base").await;
        let reply = say(&flow, "maybe").await;
        assert!(reply.contains("yes or no"));
        say(&flow, "yes").await;
        say(&flow, "yes").await;
        say(&flow, "no").await;
        say(&flow, "0").await;
        say(&flow, "0").await;
        say(&flow, "0").await;
        say(&flow, "yes").await;

        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn cancel_aborts_the_wizard() {
        let (store, flow) = flow_with(None);

        say(&flow, "/add").await;
        say(&flow, "Pepe").await;
        let reply = say(&flow, "/cancel").await;
        assert!(reply.contains("cancelled"));

        // Back to idle: a fresh /add starts over.
        let reply = say(&flow, "/add").await;
        assert!(reply.contains("token name"));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn declining_the_summary_discards_the_draft() {
        let (store, flow) = flow_with(None);

        say(&flow, "/add").await;
        for answer in [
            "Pepe", "0xabc", "900", "1100", "Base", "yes", "yes", "yes", "0", "0", "0",
        ] {
            say(&flow, answer).await;
        }
        let reply = say(&flow, "no").await;

        assert!(reply.contains("Nothing was saved"));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn duplicate_contract_is_reported() {
        let (store, flow) = flow_with(None);
        store.seed(seeded_watch(1, "Pepe", "0xabc"));

        say(&flow, "/add").await;
        for answer in [
            "Pepe Again",
            "0xabc",
            "900",
            "1100",
            "Base",
            "yes",
            "yes",
            "yes",
            "0",
            "0",
            "0",
        ] {
            say(&flow, answer).await;
        }
        let reply = say(&flow, "yes").await;

        assert!(reply.contains("❌"));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn add_is_refused_mid_flow() {
        let (_, flow) = flow_with(None);

        say(&flow, "/add").await;
        say(&flow, "Pepe").await;
        let reply = say(&flow, "/add").await;

        assert!(reply.contains("/cancel"));
    }

    #[tokio::test]
    async fn edit_flow_updates_one_field() {
        let (store, flow) = flow_with(None);
        store.seed(seeded_watch(1, "Pepe", "0xabc"));
        store.seed(seeded_watch(2, "Wojak", "0xdef"));

        let menu = say(&flow, "/edit").await;
        assert!(menu.contains("1. Pepe"));
        assert!(menu.contains("2. Wojak"));

        let fields = say(&flow, "2").await;
        assert!(fields.contains("Buy Tax"));

        let prompt = say(&flow, "6").await;
        assert!(prompt.contains("buy tax"));

        let confirm = say(&flow, "7.5").await;
        assert!(confirm.contains("Set Buy Tax of Wojak to 7.5%?"));

        let reply = say(&flow, "yes").await;
        assert!(reply.starts_with("✅"));

        let watches = store.snapshot();
        assert_eq!(watches[1].taxes.buy, dec!(7.5));
        assert_eq!(watches[0].taxes.buy, dec!(1));
    }

    #[tokio::test]
    async fn zone_edit_rejects_inverting_the_zone() {
        let (store, flow) = flow_with(None);
        store.seed(seeded_watch(1, "Pepe", "0xabc"));

        say(&flow, "/edit").await;
        say(&flow, "1").await;
        say(&flow, "9").await; // Buy Zone Low

        // 2000 > existing high of 1100
        let reply = say(&flow, "2000").await;
        assert!(reply.contains("Try another value"));

        let confirm = say(&flow, "800").await;
        assert!(confirm.contains("Set Buy Zone Low of Pepe to $800.00?"));
        say(&flow, "yes").await;

        assert_eq!(store.snapshot()[0].buy_zone.low(), dec!(800));
    }

    #[tokio::test]
    async fn edit_with_empty_watchlist_points_at_add() {
        let (_, flow) = flow_with(None);
        let reply = say(&flow, "/edit").await;
        assert!(reply.contains("/add"));
    }

    #[tokio::test]
    async fn view_renders_caps_and_bookkeeping() {
        let (store, flow) = flow_with(Some(dec!(1234.5)));
        let mut watch = seeded_watch(1, "Pepe", "0xabc");
        watch.initial_market_cap = Some(dec!(950));
        watch.last_notified_multiple = 5;
        store.seed(watch);

        let reply = say(&flow, "/view").await;

        assert!(reply.contains("Pepe (Ethereum)"));
        assert!(reply.contains("$1,234.50"));
        assert!(reply.contains("$950.00"));
        assert!(reply.contains("5x"));
    }

    #[tokio::test]
    async fn view_shows_na_when_quote_unavailable() {
        let (store, flow) = flow_with(None);
        store.seed(seeded_watch(1, "Pepe", "0xabc"));

        let reply = say(&flow, "/view").await;
        assert!(reply.contains("N/A"));
    }

    #[tokio::test]
    async fn unknown_command_points_at_help() {
        let (_, flow) = flow_with(None);
        let reply = say(&flow, "/frobnicate").await;
        assert!(reply.contains("/help"));
    }
}
