// Isolated-cache capability probe
//
// Project kinds are polymorphic with no shared static contract for the
// "does this build use a private dependency cache?" question. Two tiers,
// first match wins:
//
// 1. Statically-known kind: downcast to FreestyleProject and scan its
//    ordered build steps for a dependency-resolve step with the isolated
//    cache flag. A freestyle project without such a step answers "no"
//    without falling through to tier 2.
// 2. Anything else: query the optional SupportsIsolatedCache capability.
//    Absence, or a failing query, answers "no"; failures are logged and
//    never propagated.

use tracing::warn;

use crate::models::{BuildStep, FreestyleProject, ProjectHandle};

/// Decide whether the project's checks should resolve into an isolated,
/// per-workspace dependency cache instead of the node-wide shared one.
pub fn uses_isolated_cache(project: &dyn ProjectHandle) -> bool {
    if let Some(freestyle) = project.as_any().downcast_ref::<FreestyleProject>() {
        return freestyle.steps.iter().any(|step| {
            matches!(
                step,
                BuildStep::DependencyResolve {
                    use_isolated_cache: true
                }
            )
        });
    }

    match project.isolated_cache_capability() {
        Some(capability) => match capability.uses_isolated_cache() {
            Ok(answer) => answer,
            Err(e) => {
                warn!(
                    project = %project.name(),
                    error = %e,
                    "isolated-cache capability query failed, assuming shared cache"
                );
                false
            }
        },
        None => false,
    }
}
