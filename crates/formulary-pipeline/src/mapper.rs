//! Stage 2: map requested categories and operations onto target functions.

use std::sync::Arc;

use tracing::{debug, info, warn};

use formulary_catalog::compat::{self, NOT_SUPPORTED};
use formulary_core::analysis::RequirementAnalysis;
use formulary_core::mapping::{AvailableFunction, MappingResult, MissingFunction};
use formulary_llm::CompletionService;

use crate::error::{Result, StageError};

/// Mapping confidence below which the completion service is consulted.
pub const DEFAULT_ENHANCE_BELOW: f64 = 0.8;

/// Confidence bonus when the enhancement request returns text.
const ENHANCEMENT_BONUS: f64 = 0.1;

/// Stage 2 of the pipeline.
pub struct FunctionMapper {
    service: Arc<dyn CompletionService>,
    enhance_below: f64,
}

impl FunctionMapper {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            enhance_below: DEFAULT_ENHANCE_BELOW,
        }
    }

    pub fn with_enhance_below(mut self, threshold: f64) -> Self {
        self.enhance_below = threshold;
        self
    }

    pub fn try_map(&self, analysis: &RequirementAnalysis, session: Option<&str>) -> Result<MappingResult> {
        let (available, missing) = resolve(analysis)?;
        let confidence = base_confidence(available.len(), missing.len());

        let mut suggestions = None;
        let mut confidence = confidence;
        if confidence < self.enhance_below {
            let prompt = enhancement_prompt(analysis, available.len(), missing.len());
            match self.service.complete(&prompt, session) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(len = text.len(), "mapping enhanced");
                    suggestions = Some(text);
                    confidence = (confidence + ENHANCEMENT_BONUS).min(1.0);
                }
                Ok(_) => debug!("mapping enhancement returned nothing"),
                Err(e) => warn!(stage = "map", error = %e, "mapping enhancement failed"),
            }
        }

        Ok(MappingResult::new(available, missing, confidence, suggestions))
    }

    /// Maps `analysis`; on failure returns [`MappingResult::fallback`].
    pub fn map(&self, analysis: &RequirementAnalysis, session: Option<&str>) -> MappingResult {
        match self.try_map(analysis, session) {
            Ok(result) => {
                info!(
                    stage = "map",
                    available = result.available_functions.len(),
                    missing = result.missing_functions.len(),
                    score = result.overall_compatibility,
                    "mapping complete"
                );
                result
            }
            Err(e) => {
                warn!(stage = "map", session = session.unwrap_or("-"), error = %e, "mapping failed, using fallback");
                MappingResult::fallback()
            }
        }
    }
}

impl std::fmt::Debug for FunctionMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionMapper")
            .field("enhance_below", &self.enhance_below)
            .finish()
    }
}

/// Runs every requested category generator, then records each requested
/// operation that nothing covers. Deterministic for a given analysis.
fn resolve(analysis: &RequirementAnalysis) -> Result<(Vec<AvailableFunction>, Vec<MissingFunction>)> {
    if analysis.function_categories.is_empty() && analysis.operations().next().is_none() {
        return Err(StageError::Validation(
            "analysis names no categories or operations".into(),
        ));
    }

    let mut available: Vec<AvailableFunction> = Vec::new();
    let mut missing: Vec<MissingFunction> = Vec::new();
    for &category in &analysis.function_categories {
        let mapping = compat::map_category(category, analysis);
        debug!(%category, available = mapping.available.len(), "category mapped");
        for function in mapping.available {
            if available.iter().all(|f| f.source_function != function.source_function) {
                available.push(function);
            }
        }
        for function in mapping.missing {
            if missing.iter().all(|m| m.source_function != function.source_function) {
                missing.push(function);
            }
        }
    }

    for op in analysis.operations() {
        let covered = available.iter().any(|f| {
            f.source_function.eq_ignore_ascii_case(op) || f.target_function.eq_ignore_ascii_case(op)
        });
        let recorded = missing.iter().any(|m| m.source_function.eq_ignore_ascii_case(op));
        if !covered && !recorded {
            missing.push(MissingFunction::new(op, NOT_SUPPORTED, compat::suggested_alternative(op)));
        }
    }
    Ok((available, missing))
}

/// 0.8 less 0.1 per missing function, never below 0.2; 0.2 with nothing
/// available.
fn base_confidence(available: usize, missing: usize) -> f64 {
    if available == 0 {
        return 0.2;
    }
    (0.8 - 0.1 * missing as f64).clamp(0.2, 0.8)
}

fn enhancement_prompt(analysis: &RequirementAnalysis, available: usize, missing: usize) -> String {
    format!(
        "Analyze the following function mapping scenario and suggest improvements:\n\n\
         Original Requirements: {}\n\
         Current Mappings: {available} functions mapped\n\
         Missing Functions: {missing} functions missing\n\n\
         Suggest alternative approaches or custom implementations for missing functionality.",
        analysis.business_logic
    )
}
