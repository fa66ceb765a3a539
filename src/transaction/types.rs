/// Transaction types for SimChain
use serde::{Deserialize, Deserializer, Serialize};

/// Sender address reserved for mining-reward transactions.
pub const REWARD_SENDER: &str = "0";

/// How `sender`, `recipient` and `amount` are turned into the signed bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageEncoding {
    /// `sender ∥ recipient ∥ amount` with no delimiter. This is what the ledger
    /// and existing wallets sign, so it stays the default even though distinct
    /// triples can collide ("1"+"23" vs "12"+"3").
    #[default]
    Concatenated,
    /// Every field is preceded by its byte length as a big-endian u64, which
    /// makes the encoding injective. Both ends must opt in.
    LengthPrefixed,
}

impl MessageEncoding {
    pub fn encode(&self, sender: &str, recipient: &str, amount: &str) -> Vec<u8> {
        let fields = [sender, recipient, amount];
        match self {
            MessageEncoding::Concatenated => fields.concat().into_bytes(),
            MessageEncoding::LengthPrefixed => {
                let mut message =
                    Vec::with_capacity(fields.iter().map(|f| f.len() + 8).sum::<usize>());
                for field in fields {
                    message.extend_from_slice(&(field.len() as u64).to_be_bytes());
                    message.extend_from_slice(field.as_bytes());
                }
                message
            }
        }
    }
}

/// Textual form of an amount inside the signed message, following
/// JavaScript's `Number#toString`: shortest round-trip digits, integral values
/// without a fractional part (`10`, not `10.0`), and exponent notation below
/// `1e-6` or from `1e21` upward (`1e-7`, `1e+21`).
pub fn amount_to_message_string(amount: f64) -> String {
    if amount.is_nan() {
        return "NaN".to_string();
    }
    if amount.is_infinite() {
        return if amount > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if amount == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest digits, e.g. "1.2345e3"
    let scientific = format!("{:e}", amount.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return amount.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return amount.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, sign, (n - 1).abs())
        }
    };

    if amount < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// A ledger transaction as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    #[serde(default)]
    pub fee: f64,
    /// Hex `r ∥ s`; reward transactions arrive with `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub signature: String,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64, fee: f64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            fee,
            signature: String::new(),
        }
    }

    /// Reward transactions are minted by the ledger and carry no signature.
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    pub fn signable_message(&self, encoding: MessageEncoding) -> Vec<u8> {
        encoding.encode(
            &self.sender,
            &self.recipient,
            &amount_to_message_string(self.amount),
        )
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = signature;
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
