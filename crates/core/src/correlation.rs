//! Seam to the external policy-correlation engine.

use flowscope_proto::flow;

use crate::getters::EndpointGetter;

/// Annotates a fully decoded flow with the policy rules that produced its
/// verdict. Implemented outside this crate; invoked best-effort after all
/// other flow fields are populated.
pub trait PolicyCorrelator: Send + Sync {
    fn correlate(&self, endpoints: &dyn EndpointGetter, flow: &mut flow::Flow)
        -> anyhow::Result<()>;
}
