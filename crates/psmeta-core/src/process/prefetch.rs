//! Resolves everything a restricted handle will be asked for, up front.

use crate::process::backend::ProcessBackend;
use crate::process::error::ProcessError;
use crate::process::field::{Field, Resolver};
use crate::process::handle::Process;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Union of the resolvers behind `fields`, in dependency order.
pub fn plan(fields: &[Field]) -> BTreeSet<Resolver> {
    fields
        .iter()
        .flat_map(|field| field.resolvers().iter().copied())
        .collect()
}

/// Runs the plan for `fields` against `process`, skipping resolvers whose
/// slot is already populated. The first failure aborts.
pub(crate) fn run<B: ProcessBackend>(
    process: &mut Process<B>,
    fields: &[Field],
) -> Result<(), ProcessError> {
    let plan = plan(fields);
    debug!(pid = process.pid(), resolvers = ?plan, "prefetching process attributes");

    for resolver in plan {
        if process.is_resolved(resolver) {
            trace!(pid = process.pid(), ?resolver, "already resolved");
            continue;
        }
        trace!(pid = process.pid(), ?resolver, "running resolver");
        process.resolve(resolver)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_deduplicates_and_orders() {
        let plan = plan(&[Field::Terminal, Field::Ppid, Field::Times, Field::Name]);
        let ordered: Vec<Resolver> = plan.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Resolver::Stat, Resolver::Status, Resolver::Terminal]
        );
    }

    #[test]
    fn test_plan_rlimit_usage_dependencies_first() {
        let ordered: Vec<Resolver> = plan(&[Field::RlimitUsage]).into_iter().collect();
        assert_eq!(ordered.last(), Some(&Resolver::RlimitUsage));
        assert!(ordered.contains(&Resolver::Limits));
        assert!(ordered.contains(&Resolver::FdList));
    }

    #[test]
    fn test_plan_unimplemented_fields_add_nothing() {
        assert!(plan(&[Field::IoNice]).is_empty());
        let ordered: Vec<Resolver> = plan(&[Field::Connections, Field::IoNice])
            .into_iter()
            .collect();
        assert_eq!(ordered, vec![Resolver::FdList, Resolver::Connections]);
    }
}
