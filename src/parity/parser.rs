//! Parser for par2 command output

use super::traits::{RepairResult, VerifyResult};
use std::str;

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command exited successfully (exit code 0)
    Success,
    /// The command exited with a non-zero exit code
    Failure,
}

impl ExitStatus {
    /// Returns `true` if the exit status represents success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for ExitStatus {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Parse output from `par2 v` (verify) command
///
/// Parses the stdout/stderr from a par2 verify command to extract
/// information about file integrity, damaged blocks, and repair possibility.
///
/// # Arguments
///
/// * `stdout` - Standard output from the par2 command
/// * `stderr` - Standard error from the par2 command
/// * `success` - Whether the command exited successfully
///
/// # Returns
///
/// A `VerifyResult` containing verification details
pub fn parse_par2_verify_output(
    stdout: &[u8],
    stderr: &[u8],
    exit_status: ExitStatus,
) -> crate::Result<VerifyResult> {
    let output = str::from_utf8(stdout).unwrap_or_default();
    let error_output = str::from_utf8(stderr).unwrap_or_default();

    // Combine both outputs for parsing
    let combined = format!("{}\n{}", output, error_output);

    // Initialize result
    let mut damaged_blocks = 0;
    let mut recovery_blocks_available = 0;
    let mut damaged_files = Vec::new();
    let mut missing_files = Vec::new();

    // Parse output line by line
    for line in combined.lines() {
        let line_lower = line.to_lowercase();

        // Look for damaged/missing block counts
        if (line_lower.contains("damaged") || line_lower.contains("missing"))
            && let Some(count) = extract_number_before_blocks(&line_lower)
        {
            damaged_blocks = damaged_blocks.max(count);
        }

        // Look for recovery block information
        if line_lower.contains("recovery")
            && line_lower.contains("block")
            && let Some(count) = extract_number_before_blocks(&line_lower)
        {
            recovery_blocks_available = recovery_blocks_available.max(count);
        }

        // Look for specific file mentions
        if (line_lower.contains("damaged:") || line_lower.contains("corrupt:"))
            && let Some(filename) = line.split(':').nth(1)
        {
            let filename = filename.trim().to_string();
            if !filename.is_empty() && !damaged_files.contains(&filename) {
                damaged_files.push(filename);
            }
        }

        if line_lower.contains("missing:")
            && let Some(filename) = line.split(':').nth(1)
        {
            let filename = filename.trim().to_string();
            if !filename.is_empty() && !missing_files.contains(&filename) {
                missing_files.push(filename);
            }
        }

        // Handle par2cmdline format: Target: "filename" - missing.
        if line_lower.contains("- missing")
            && let Some(filename) = extract_filename_from_line(line)
            && !missing_files.contains(&filename)
        {
            missing_files.push(filename);
        }

        // Handle par2cmdline format: Target: "filename" - damaged.
        if line_lower.contains("- damaged")
            && let Some(filename) = extract_filename_from_line(line)
            && !damaged_files.contains(&filename)
        {
            damaged_files.push(filename);
        }
    }

    // Determine completeness based on exit code and damaged blocks
    let is_complete = exit_status.is_success() && damaged_blocks == 0 && missing_files.is_empty();

    // Determine if repair is possible
    let repairable =
        (damaged_blocks > 0 || !missing_files.is_empty()) && recovery_blocks_available > 0;

    Ok(VerifyResult {
        is_complete,
        damaged_blocks,
        recovery_blocks_available,
        repairable,
        damaged_files,
        missing_files,
    })
}

/// Parse output from `par2 r` (repair) command
///
/// Parses the stdout/stderr from a par2 repair command to extract
/// information about repair success and which files were repaired.
///
/// # Arguments
///
/// * `stdout` - Standard output from the par2 command
/// * `stderr` - Standard error from the par2 command
/// * `success` - Whether the command exited successfully
///
/// # Returns
///
/// A `RepairResult` containing repair details
pub fn parse_par2_repair_output(
    stdout: &[u8],
    stderr: &[u8],
    exit_status: ExitStatus,
) -> crate::Result<RepairResult> {
    let output = str::from_utf8(stdout).unwrap_or_default();
    let error_output = str::from_utf8(stderr).unwrap_or_default();

    // Combine both outputs for parsing
    let combined = format!("{}\n{}", output, error_output);

    let mut repaired_files = Vec::new();
    let mut failed_files = Vec::new();
    let mut error = None;

    // Parse output line by line
    for line in combined.lines() {
        let line_lower = line.to_lowercase();

        // Look for repair success indicators
        if (line_lower.contains("repaired") || line_lower.contains("restored"))
            && let Some(filename) = extract_filename_from_line(line)
            && !repaired_files.contains(&filename)
        {
            repaired_files.push(filename);
        }

        // Look for repair failures
        if (line_lower.contains("failed") || line_lower.contains("could not repair"))
            && let Some(filename) = extract_filename_from_line(line)
            && !failed_files.contains(&filename)
        {
            failed_files.push(filename);
        }

        // Capture error messages
        if line_lower.contains("error") && error.is_none() {
            error = Some(line.trim().to_string());
        }
    }

    // If command failed but we don't have an error message, use stderr
    if !exit_status.is_success() && error.is_none() && !error_output.is_empty() {
        error = Some(error_output.trim().to_string());
    }

    Ok(RepairResult {
        success: exit_status.is_success(),
        repaired_files,
        failed_files,
        error,
    })
}

/// Extract a number that appears before the word "block" or "blocks" in a line.
///
/// Handles various par2cmdline output formats:
/// - "5 blocks damaged" (number directly before "blocks")
/// - "Found 1999 of 2000 data blocks" (number before intervening words then "blocks")
/// - "You have 577 recovery blocks available" (same pattern)
fn extract_number_before_blocks(line: &str) -> Option<u32> {
    let words: Vec<&str> = line.split_whitespace().collect();

    // Find the position of "block" or "blocks" in the line
    for i in 0..words.len() {
        if words[i].starts_with("block") {
            // Search backwards from the "block(s)" word for the nearest number
            // This handles patterns like "577 recovery blocks" where a word sits between
            // the number and "blocks"
            for j in (0..i).rev() {
                if let Ok(num) = words[j].parse::<u32>() {
                    return Some(num);
                }
            }
        }
    }
    None
}

/// Extract filename from a line (look for quoted strings or after colons)
fn extract_filename_from_line(line: &str) -> Option<String> {
    // Try to find quoted filename first
    if let Some(start) = line.find('"')
        && let Some(end) = line[start + 1..].find('"')
    {
        return Some(line[start + 1..start + 1 + end].to_string());
    }

    // Try to find filename after colon
    if let Some(filename) = line.split(':').nth(1) {
        let filename = filename.trim().to_string();
        if !filename.is_empty() {
            return Some(filename);
        }
    }

    None
}
