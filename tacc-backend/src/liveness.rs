//! Liveness analysis
//!
//! Classic backward dataflow over a per-quad control flow graph:
//!
//! ```text
//! live_out[i] = U live_in[s]  for s in succ(i)
//! live_in[i]  = use[i] U (live_out[i] - def[i])
//! ```
//!
//! iterated to a fixed point. Only names take part; literals, labels and
//! frame addresses never do.

use crate::segment::FunctionUnit;
use log::trace;
use std::collections::{BTreeMap, BTreeSet};
use tacc_common::CodegenError;
use tacc_ir::{OpCode, Operand, Quad};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    successors: Vec<Vec<usize>>,
    live_in: Vec<BTreeSet<String>>,
    live_out: Vec<BTreeSet<String>>,
}

/// The name written by a quad, if any
pub fn def(quad: &Quad) -> Option<&str> {
    if quad.op.writes_dst() {
        quad.dst_name()
    } else {
        None
    }
}

/// Names read by a quad. `call` reads the values of the `param` quads
/// pending before it, which the caller supplies.
pub fn uses<'a>(quad: &'a Quad, pending_params: &[&'a str]) -> Vec<&'a str> {
    let name = |o: &'a Option<Operand>| o.as_ref().and_then(Operand::as_name);
    match quad.op {
        OpCode::Label | OpCode::Goto => Vec::new(),
        OpCode::Call => pending_params.to_vec(),
        // Call targets and layout names are labels, never names
        OpCode::Alloc => Vec::new(),
        _ => [name(&quad.a1), name(&quad.a2)].into_iter().flatten().collect(),
    }
}

impl Liveness {
    /// Analyze one normalized function
    pub fn analyze(unit: &FunctionUnit) -> Result<Self, CodegenError> {
        let quads = &unit.quads;
        let n = quads.len();

        let mut labels = BTreeMap::new();
        for (i, q) in quads.iter().enumerate() {
            if q.op == OpCode::Label {
                if let Some(l) = q.target() {
                    if labels.insert(l, i).is_some() {
                        return Err(CodegenError::malformed(
                            unit.pos(i),
                            format!("label '{l}' is defined twice"),
                        ));
                    }
                }
            }
        }

        let resolve = |i: usize, q: &Quad| -> Result<usize, CodegenError> {
            let target = q.target().unwrap_or_default();
            labels
                .get(target)
                .copied()
                .ok_or_else(|| CodegenError::unresolved(unit.pos(i), target))
        };

        let mut successors = Vec::with_capacity(n);
        for (i, q) in quads.iter().enumerate() {
            let next = if i + 1 < n { Some(i + 1) } else { None };
            let succ = match q.op {
                OpCode::Goto => vec![resolve(i, q)?],
                OpCode::IfGoto => {
                    let taken = resolve(i, q)?;
                    let mut s = vec![taken];
                    s.extend(next.filter(|&f| f != taken));
                    s
                }
                OpCode::Ret => Vec::new(),
                _ => next.into_iter().collect(),
            };
            successors.push(succ);
        }

        let mut use_sets: Vec<BTreeSet<String>> = Vec::with_capacity(n);
        let mut pending: Vec<&str> = Vec::new();
        for q in quads {
            use_sets.push(uses(q, &pending).into_iter().map(str::to_string).collect());
            match q.op {
                OpCode::Param => pending.extend(q.a1.as_ref().and_then(Operand::as_name)),
                OpCode::Call => pending.clear(),
                _ => {}
            }
        }

        let mut live_in = vec![BTreeSet::new(); n];
        let mut live_out = vec![BTreeSet::new(); n];
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for i in (0..n).rev() {
                let mut out: BTreeSet<String> = BTreeSet::new();
                for &s in &successors[i] {
                    out.extend(live_in[s].iter().cloned());
                }
                let mut inn = use_sets[i].clone();
                let killed = def(&quads[i]);
                inn.extend(out.iter().filter(|v| Some(v.as_str()) != killed).cloned());

                if inn != live_in[i] || out != live_out[i] {
                    live_in[i] = inn;
                    live_out[i] = out;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        trace!("Liveness for '{}' converged after {rounds} round(s)", unit.name);

        Ok(Self { successors, live_in, live_out })
    }

    pub fn live_in(&self, index: usize) -> &BTreeSet<String> {
        &self.live_in[index]
    }

    pub fn live_out(&self, index: usize) -> &BTreeSet<String> {
        &self.live_out[index]
    }

    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    pub fn is_live_after(&self, name: &str, index: usize) -> bool {
        self.live_out[index].contains(name)
    }

    /// Names whose value must survive at least one call
    pub fn live_across_calls(&self, quads: &[Quad]) -> BTreeSet<String> {
        let mut crossing = BTreeSet::new();
        for (i, q) in quads.iter().enumerate() {
            if q.op == OpCode::Call {
                let written = def(q);
                crossing.extend(
                    self.live_out[i]
                        .iter()
                        .filter(|v| Some(v.as_str()) != written)
                        .cloned(),
                );
            }
        }
        crossing
    }

    pub fn len(&self) -> usize {
        self.live_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_out.is_empty()
    }
}
