//! Function Lowering - Converts one function unit to assembly
//! 
//! The body is selected first, into its own writer, because the frame size
//! is only known once every spill slot has been handed out. The prologue
//! is then generated from the final frame and placed in front of it.

use crate::isel::{epilogue_label, symbol, InstructionSelector, ProgramContext};
use crate::liveness::Liveness;
use crate::normalize::validate;
use crate::segment::FunctionUnit;
use crate::strings::StringPool;
use log::{debug, info};
use tacc_codegen::{AsmWriter, Frame};
use tacc_common::CodegenError;
use tacc_ir::Operand;

/// Lower a single function unit
pub(super) fn lower_function(
    unit: &FunctionUnit,
    ctx: &ProgramContext<'_>,
    strings: &mut StringPool,
) -> Result<AsmWriter, CodegenError> {
    info!("Lowering function '{}' ({} quads)", unit.name, unit.quads.len());

    for (index, quad) in unit.quads.iter().enumerate() {
        validate(quad, &unit.pos(index))?;
    }

    let liveness = Liveness::analyze(unit)?;
    let frame = reserve_frame_refs(unit)?;

    let (body, frame) = InstructionSelector::new(unit, &liveness, ctx, strings, frame).run()?;
    debug!(
        "'{}': frame of {} bytes ({} param(s), {} local(s), {} spill slot(s), {} saved register(s))",
        unit.name,
        frame.size(),
        frame.param_count(),
        frame.locals(),
        frame.spills(),
        frame.saved_regs().len()
    );

    let mut out = AsmWriter::new();
    out.text();
    out.label(&symbol(&unit.name));
    out.emit_all(frame.gen_prologue());
    out.append(body);
    out.label(&epilogue_label(&unit.name));
    if unit.is_entry {
        out.emit_all(frame.gen_exit());
    } else {
        out.emit_all(frame.gen_epilogue());
    }
    Ok(out)
}

/// Reserve `[fp-1]` through the deepest `[fp-k]` the quads mention, so
/// those slots keep their front-end meaning and spills land below them
fn reserve_frame_refs(unit: &FunctionUnit) -> Result<Frame, CodegenError> {
    let mut frame = Frame::new(&unit.name);
    let mut deepest: Option<(i32, usize)> = None;
    for (index, quad) in unit.quads.iter().enumerate() {
        for operand in [&quad.a1, &quad.a2, &quad.dst].into_iter().flatten() {
            if let Operand::FrameAddr { offset, .. } = operand {
                if *offset >= 0 {
                    continue;
                }
                let depth = offset.checked_neg().ok_or_else(|| {
                    CodegenError::exhausted(unit.pos(index), format!("frame offset {offset} is out of range"))
                })?;
                if deepest.map_or(true, |(d, _)| depth > d) {
                    deepest = Some((depth, index));
                }
            }
        }
    }

    if let Some((depth, index)) = deepest {
        for k in 1..=depth {
            frame
                .allocate_local(&format!("[fp-{k}]"))
                .map_err(|e| CodegenError::exhausted(unit.pos(index), e.to_string()))?;
        }
    }
    Ok(frame)
}
