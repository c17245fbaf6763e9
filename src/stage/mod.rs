mod classifier;
mod gate;
pub mod runner;
mod table;

pub use classifier::{CLASS_LABELS, Stage2Classifier, Stage2Verdict};
pub use gate::Stage1Gate;
pub use runner::{ProcessExecutor, StageExecutor, StageRunner};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two external classifiers, in pipeline order.
///
/// Each kind fixes the naming conventions the external tool uses: where its
/// result table lands, where it keeps shared intermediate state, and which
/// ledger file its failures go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Stage 1: TooT-T, the transporter filter.
    Transporter,
    /// Stage 2: TooT-SC, the substrate-class classifier.
    Substrate,
}

impl StageKind {
    /// Name of the external tool, also its directory name under the shared work root.
    pub fn tool_name(self) -> &'static str {
        match self {
            StageKind::Transporter => "TooT-T",
            StageKind::Substrate => "TooT-SC",
        }
    }

    /// File name of the result table the tool writes into its `-out` directory.
    pub fn result_file(self) -> &'static str {
        match self {
            StageKind::Transporter => "TooTTout.csv",
            StageKind::Substrate => "TooTSCout.csv",
        }
    }

    /// File name of this stage's failure ledger.
    pub fn ledger_file(self) -> &'static str {
        match self {
            StageKind::Transporter => "TooT-TProblemSeq.txt",
            StageKind::Substrate => "TooT-SCProblemSeq.txt",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}
