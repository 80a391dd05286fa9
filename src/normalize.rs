use crate::models::{NormalizedRequest, NormalizedTarget, QueryRequest, PLACEHOLDER_TARGET};
use crate::template::{Interpolator, VariableFormat};

/// Drops placeholder targets, resolves variables in every remaining target
/// and defaults its kind to `timeserie`. Hidden and non-timeserie targets are
/// kept here; the request builder filters them.
pub fn normalize(request: &QueryRequest, templates: &dyn Interpolator) -> NormalizedRequest {
    let targets = request
        .targets
        .iter()
        .filter(|t| t.target != PLACEHOLDER_TARGET)
        .map(|t| NormalizedTarget {
            target: templates.replace(&t.target, Some(&request.scoped_vars), VariableFormat::Regex),
            ref_id: t.ref_id.clone(),
            hide: t.hide,
            kind: t.kind.clone().unwrap_or_default(),
        })
        .collect();

    NormalizedRequest {
        range: request.range.clone(),
        targets,
        max_data_points: request.max_data_points,
    }
}
