//! Reply and broadcast lines sent by the server.

use crate::error::ErrorCode;
use crate::PROTOCOL_VERSION;
use std::fmt;

const HELP_LINES: &[&str] = &[
    "  SPEAK <msg>: send a message",
    "  LSMEM: list connected users",
    "  CREAT <auction_name> <min_price> <increment> <duration_sec>: put up an auction",
    "  LSAUC: list all running auctions",
    "  BID <auction_id> <amount>: make a bid for a given auction",
    "  PING <ts>: keep-alive, server replies PONG <ts>",
    "  LEAVE: disconnect",
];

/// One row of an `LSAUC` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSummary {
    pub id: u64,
    pub name: String,
    pub min_price: u64,
    pub current_bid: u64,
    pub secs_left: u64,
    pub participants: usize,
}

/// A server-to-client message.
///
/// Listing replies span several lines; `Display` joins them with `\n` and
/// leaves the final newline to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Greeting,
    Hello {
        name: String,
    },
    Pong {
        token: String,
    },
    Okay,
    OkayWithId {
        id: u64,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    Help,
    Speak {
        from: String,
        text: String,
    },
    Members(Vec<String>),
    Created {
        id: u64,
        name: String,
        min_price: u64,
        increment: u64,
        duration_secs: u64,
    },
    Auctions(Vec<AuctionSummary>),
    Bid {
        bidder_tag: String,
        amount: u64,
        auction_id: u64,
    },
    Won {
        name: String,
        amount: u64,
        auction_id: u64,
    },
    NoBids {
        auction_id: u64,
    },
    Left {
        name: String,
    },
}

impl Reply {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Reply::Error {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Greeting => write!(f, "BIDS {} , HELP for help", PROTOCOL_VERSION),
            Reply::Hello { name } => write!(f, "HELLO {}", name),
            Reply::Pong { token } => write!(f, "PONG {}", token),
            Reply::Okay => f.write_str("OKAY!"),
            Reply::OkayWithId { id } => write!(f, "OKAY! {}", id),
            Reply::Error { code, message } => write!(f, "ERROR {} {}", code, message),
            Reply::Help => {
                f.write_str("HELP available commands:")?;
                for line in HELP_LINES {
                    write!(f, "\n{}", line)?;
                }
                Ok(())
            }
            Reply::Speak { from, text } => write!(f, "SPEAK {} {}", from, text),
            Reply::Members(names) => {
                write!(f, "LSMEM {}", names.len())?;
                for name in names {
                    write!(f, "\n{}", name)?;
                }
                Ok(())
            }
            Reply::Created {
                id,
                name,
                min_price,
                increment,
                duration_secs,
            } => write!(
                f,
                "CREAT {} {} {} {} {}",
                id, name, min_price, increment, duration_secs
            ),
            Reply::Auctions(rows) => {
                write!(f, "LSAUC {}", rows.len())?;
                for row in rows {
                    write!(
                        f,
                        "\n{} {} {} {} {} {}",
                        row.id,
                        row.name,
                        row.min_price,
                        row.current_bid,
                        row.secs_left,
                        row.participants
                    )?;
                }
                Ok(())
            }
            Reply::Bid {
                bidder_tag,
                amount,
                auction_id,
            } => write!(f, "BID {} {} {}", bidder_tag, amount, auction_id),
            Reply::Won {
                name,
                amount,
                auction_id,
            } => write!(f, "WIN {} {} {}", name, amount, auction_id),
            Reply::NoBids { auction_id } => write!(f, "END {} NO_BIDS", auction_id),
            Reply::Left { name } => write!(f, "LEAVE {}", name),
        }
    }
}
