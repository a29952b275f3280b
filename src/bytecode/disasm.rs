// =============================================================================
// DISASM - Human-readable listing of a compiled script
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::op::{Instruction, OperandFamily, Opcode};
use super::script::ScriptView;

/// Print the full listing of a script.
pub fn print_script(script: &ScriptView) {
    print!("{}", disassemble_to_string(script));
}

/// Listing as a String: a header box, the data section size and one line
/// per instruction.
pub fn disassemble_to_string(script: &ScriptView) -> String {
    let mut output = String::new();
    let name = script.module_name().unwrap_or_else(|| "<anonymous>".to_string());

    let _ = writeln!(output, "╔══════════════════════════════════════");
    let _ = writeln!(output, "║ module {}", name);
    let _ = writeln!(output, "║ version {}", script.header.version);
    let _ = writeln!(
        output,
        "║ {} instruction(s), {} data byte(s)",
        script.len(),
        script.data.len()
    );
    let _ = writeln!(output, "╚══════════════════════════════════════");

    output.push_str(&disassemble_code(script));
    output
}

/// Instruction lines only. Jump targets are marked with `►`.
pub fn disassemble_code(script: &ScriptView) -> String {
    let mut output = String::new();
    let jump_targets = collect_jump_targets(script);

    for (ip, ins) in script.instructions().enumerate() {
        if jump_targets.contains(&ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        let _ = write!(output, "{:04} ", ip);
        if jump_targets.contains(&ip) {
            output.push_str("► ");
        } else {
            output.push_str("  ");
        }

        output.push_str(&format_instruction(&ins, ip, script.data));
        output.push('\n');
    }

    output
}

fn collect_jump_targets(script: &ScriptView) -> HashSet<usize> {
    script
        .instructions()
        .filter(|ins| ins.opcode().map(|op| op.family()) == Some(OperandFamily::Target))
        .map(|ins| ins.word() as usize)
        .collect()
}

fn format_instruction(ins: &Instruction, ip: usize, data: &[u8]) -> String {
    let Some(opcode) = ins.opcode() else {
        return format!("??          tag {:#04x}", ins.tag());
    };
    let name = opcode.name();

    match opcode.family() {
        OperandFamily::None => name.to_string(),
        OperandFamily::Code => format!("{:<11} {}", name, ins.code()),
        OperandFamily::Target => {
            let target = ins.word() as usize;
            let arrow = if target > ip { "↓" } else { "↑" };
            format!("{:<11} {} (→ {:04})", name, arrow, target)
        }
        OperandFamily::SizedAddress => {
            let base = format!("{:<11} {}b @{:#06x}", name, ins.width(), ins.word());
            if opcode == Opcode::PushData {
                match read_data(data, ins.word(), ins.width()) {
                    Some(bytes) => format!("{:<28} ; {}", base, hex(bytes)),
                    None => format!("{:<28} ; out of range", base),
                }
            } else {
                base
            }
        }
        OperandFamily::Address => {
            let base = format!("{:<11} @{:#06x}", name, ins.word());
            match read_string(data, ins.word()) {
                Some(s) => format!("{:<28} ; {:?}", base, s),
                None => base,
            }
        }
        OperandFamily::Count => format!("{:<11} {}b", name, ins.word()),
        OperandFamily::Sizes => format!("{:<11} {}b -> {}b", name, ins.width(), ins.second()),
        OperandFamily::Typed => match ins.kind() {
            Some(kind) => format!("{:<11} {}b {:?}", name, ins.width(), kind),
            None => format!("{:<11} {}b kind?{}", name, ins.width(), ins.second()),
        },
    }
}

fn read_data(data: &[u8], address: u32, width: u16) -> Option<&[u8]> {
    let start = address as usize;
    data.get(start..start + width as usize)
}

fn read_string(data: &[u8], address: u32) -> Option<String> {
    let start = address as usize;
    let count = u32::from_le_bytes(data.get(start..start + 4)?.try_into().ok()?) as usize;
    let units = data
        .get(start + 4..start + 4 + count * 2)?
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();
    String::from_utf16(&units).ok()
}

fn hex(bytes: &[u8]) -> String {
    let parts: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("[{}]", parts.join(" "))
}

// =============================================================================
// Statistics
// =============================================================================

/// Print instruction counts and the most frequent opcodes.
pub fn print_stats(script: &ScriptView) {
    println!("=== SCRIPT STATISTICS ===\n");
    println!("Instructions:     {}", script.len());
    println!("Data bytes:       {}", script.data.len());
    println!();

    let counts = count_ops(script);
    if counts.is_empty() {
        return;
    }

    println!("Op frequency:");
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (op, count) in sorted.iter().take(10) {
        let pct = (**count as f64 / script.len() as f64) * 100.0;
        println!("  {:<14} {:>4} ({:>5.1}%)", op, count, pct);
    }
}

/// Occurrences per mnemonic. Unknown tags are counted as `??`.
pub fn count_ops(script: &ScriptView) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for ins in script.instructions() {
        let name = ins.opcode().map(|op| op.name()).unwrap_or("??");
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}
