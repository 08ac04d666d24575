//! Linearization engine.
//!
//! Computes the ordered hierarchy used to pick the most specific handler for
//! a type. The order is the C3 linearization of the declared hierarchy,
//! extended with categories the type satisfies only through relations
//! declared after the fact.
//!
//! # Algorithm Overview
//!
//! 1. **Reduce candidates** ([`linearize`]): keep categories the type
//!    satisfies but does not declare, drop those already implied by another
//!    candidate, and splice in implemented subclass chains so independent
//!    categories come out in a stable order.
//! 2. **Place categories** ([`c3_linearize`]): a category is inserted at the
//!    node that introduces it, i.e. the node that satisfies it while none of
//!    its direct parents does.
//! 3. **Merge** ([`c3_merge`]): standard monotonic merge of the recursive
//!    results.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{DispatchError, DispatchResult};
use crate::hierarchy::{TypeId, TypeSystem};

/// Heads left over when [`c3_merge`] cannot make progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    /// Heads of the sequences that were still pending, deduplicated.
    pub pending: Vec<TypeId>,
}

/// Merges linearizations into one, C3 style.
///
/// A head is accepted only if it does not occur in the tail of any other
/// sequence. Sequences are scanned in order, so earlier sequences win ties.
pub fn c3_merge(sequences: Vec<Vec<TypeId>>) -> Result<Vec<TypeId>, MergeConflict> {
    let mut sequences: Vec<VecDeque<TypeId>> = sequences.into_iter().map(VecDeque::from).collect();
    let mut result = Vec::new();

    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        let candidate = sequences
            .iter()
            .filter_map(|s| s.front().copied())
            .find(|&head| !sequences.iter().any(|s| s.iter().skip(1).any(|&t| t == head)));

        let Some(candidate) = candidate else {
            let mut pending = Vec::new();
            for head in sequences.iter().filter_map(|s| s.front().copied()) {
                if !pending.contains(&head) {
                    pending.push(head);
                }
            }
            return Err(MergeConflict { pending });
        };

        result.push(candidate);
        for sequence in &mut sequences {
            if sequence.front() == Some(&candidate) {
                sequence.pop_front();
            }
        }
    }
}

/// C3 linearization of `ty` with `categories` inserted where they are
/// introduced.
///
/// With no categories this is exactly the declared linearization. Bases up
/// to and including the last category-bearing base are merged before any
/// inserted category, so categories a type lists itself keep precedence
/// over categories it only satisfies. A category that is itself linked to
/// another introduced category is ordered after it, never beside it.
pub fn c3_linearize<S>(types: &S, ty: TypeId, categories: &[TypeId]) -> DispatchResult<Vec<TypeId>>
where
    S: TypeSystem + ?Sized,
{
    let bases = types.bases(ty);
    let boundary = bases
        .iter()
        .rposition(|&base| types.is_abstract(base))
        .map_or(0, |i| i + 1);
    let (explicit_bases, other_bases) = bases.split_at(boundary);

    let introduced: Vec<TypeId> = categories
        .iter()
        .copied()
        .filter(|&category| {
            types.is_subtype(ty, category) && !bases.iter().any(|&base| types.is_subtype(base, category))
        })
        .collect();
    // A category another introduced category satisfies stays in `remaining`
    // and is placed beneath it by the recursion.
    let abstract_bases: Vec<TypeId> = introduced
        .iter()
        .copied()
        .filter(|&category| {
            !introduced
                .iter()
                .any(|&other| other != category && types.is_subtype(other, category))
        })
        .collect();
    let remaining: Vec<TypeId> = categories
        .iter()
        .copied()
        .filter(|category| !abstract_bases.contains(category))
        .collect();

    let mut sequences = vec![vec![ty]];
    for &base in explicit_bases.iter().chain(&abstract_bases).chain(other_bases) {
        sequences.push(c3_linearize(types, base, &remaining)?);
    }
    sequences.push(explicit_bases.to_vec());
    sequences.push(abstract_bases);
    sequences.push(other_bases.to_vec());

    c3_merge(sequences).map_err(|conflict| DispatchError::InconsistentHierarchy {
        ty: types.name(ty),
        pending: conflict.pending.iter().map(|&t| types.name(t)).collect(),
    })
}

/// Linearizes `ty`, inserting the relevant members of `candidates`.
///
/// Candidates that `ty` does not satisfy, that it already declares, or that
/// are parents of another candidate are ignored. When a candidate has a
/// declared subclass that `ty` satisfies without declaring it, the
/// candidates along that subclass's linearization are placed first, longest
/// chain first, which makes the result independent of candidate order in
/// those cases.
pub fn linearize<S, I>(types: &S, ty: TypeId, candidates: I) -> DispatchResult<Vec<TypeId>>
where
    S: TypeSystem + ?Sized,
    I: IntoIterator<Item = TypeId>,
{
    if !types.is_live(ty) {
        return Err(DispatchError::UnknownType(ty));
    }
    let declared = types.mro(ty);

    let mut related: Vec<TypeId> = Vec::new();
    for candidate in candidates {
        if !related.contains(&candidate)
            && !declared.contains(&candidate)
            && types.is_live(candidate)
            && types.is_subtype(ty, candidate)
        {
            related.push(candidate);
        }
    }

    let candidate_mros: Vec<Vec<TypeId>> = related.iter().map(|&c| types.mro(c)).collect();
    let reduced: Vec<TypeId> = related
        .iter()
        .copied()
        .filter(|&candidate| {
            !related
                .iter()
                .zip(&candidate_mros)
                .any(|(&other, mro)| other != candidate && mro.contains(&candidate))
        })
        .collect();

    fn push_unique(t: TypeId, categories: &mut Vec<TypeId>) {
        if !categories.contains(&t) {
            categories.push(t);
        }
    }

    let mut categories: Vec<TypeId> = Vec::new();
    for &category in &reduced {
        let mut found: Vec<Vec<TypeId>> = types
            .subclasses(category)
            .into_iter()
            .filter(|&sub| !declared.contains(&sub) && types.is_subtype(ty, sub))
            .map(|sub| {
                types
                    .mro(sub)
                    .into_iter()
                    .filter(|t| reduced.contains(t))
                    .collect()
            })
            .collect();
        if found.is_empty() {
            push_unique(category, &mut categories);
            continue;
        }
        // Stable: equally long chains keep subclass definition order.
        found.sort_by(|a, b| b.len().cmp(&a.len()));
        for chain in found {
            for t in chain {
                push_unique(t, &mut categories);
            }
        }
    }

    trace!(ty = %types.name(ty), ?categories, "composing linearization");
    c3_linearize(types, ty, &categories)
}
