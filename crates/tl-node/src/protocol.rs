use serde::{Deserialize, Serialize};
use tl_chain::Block;
use tl_claim::{Claim, ClaimInput};
use uuid::Uuid;

use crate::node::{MineOutcome, Node};

/// One line-delimited request read by the `tl-node` daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    /// Queue a new claim.
    Submit(ClaimInput),

    /// Mine the oldest pending claim.
    Mine,

    /// Return every block, genesis first.
    Chain,

    /// Return only the most recent block.  Full reads for display go
    /// through `chain`.
    Tip,

    /// Return the claims still waiting to be mined.
    Pending,
}

/// The reply written for each [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Submitted { message: String, claim_id: Uuid },
    Mined { message: String, index: u64, hash: String },
    Chain(Vec<Block>),
    Tip(Box<Block>),
    Pending(Vec<Claim>),
    Message { message: String },
    Error { error: String },
}

impl Response {
    pub fn error(error: impl ToString) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }
}

/// Run `request` against `node`.  Failures become [`Response::Error`].
pub async fn dispatch(node: &Node, request: Request) -> Response {
    match request {
        Request::Submit(input) => match node.submit_claim(input).await {
            Ok(claim_id) => Response::Submitted {
                message: "Claim submitted".to_string(),
                claim_id,
            },
            Err(e) => Response::error(e),
        },

        Request::Mine => match node.mine().await {
            Ok(MineOutcome::Mined { index, hash }) => Response::Mined {
                message: format!("Block #{index} mined"),
                index,
                hash,
            },
            Ok(MineOutcome::NothingToMine) => Response::Message {
                message: "No claims to mine".to_string(),
            },
            Err(e) => Response::error(e),
        },

        Request::Chain => Response::Chain(node.chain().await),

        Request::Tip => match node.tip().await {
            Ok(block) => Response::Tip(Box::new(block)),
            Err(e) => Response::error(e),
        },

        Request::Pending => Response::Pending(node.pending().await),
    }
}

/// Decode one request line.  The bytes need not be valid UTF-8; anything
/// that is not a well-formed request is an error.
pub fn decode_request(line: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(line)
}

/// Decode and run one raw request line, answering malformed input with
/// [`Response::Error`].
pub async fn respond(node: &Node, line: &[u8]) -> Response {
    match decode_request(line) {
        Ok(request) => dispatch(node, request).await,
        Err(e) => Response::error(format!("malformed request: {e}")),
    }
}

/// Encode a [`Response`] as a single JSON line (without the newline).
pub fn encode_response(resp: &Response) -> Result<String, serde_json::Error> {
    serde_json::to_string(resp)
}
