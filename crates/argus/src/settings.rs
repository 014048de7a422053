//! Immutable analysis configuration.
//!
//! Built once at driver startup and shared read-only by every translation
//! unit. Bounds on value-flow follow the same philosophy as sandbox resource
//! limits: every analysis loop has a budget and runs to completion or bails
//! out with a diagnostic, never indefinitely.

use crate::{diagnostics::Colors, diagnostics::Severity, library::Library, platform::Platform, suppressions::Suppressions};

/// Default rendering template.
pub const DEFAULT_TEMPLATE: &str = "{file}:{line}:{column}: {severity}:{inconclusive:inconclusive:} {message} [{id}]";

/// Which severity categories are published.
///
/// Errors are always on; `information` carries analysis notes (bailouts,
/// unused suppressions) and is off by default.
#[derive(Debug, Clone)]
pub struct EnabledChecks {
    pub warning: bool,
    pub style: bool,
    pub performance: bool,
    pub portability: bool,
    pub information: bool,
}

impl Default for EnabledChecks {
    fn default() -> Self {
        Self {
            warning: true,
            style: true,
            performance: true,
            portability: true,
            information: false,
        }
    }
}

impl EnabledChecks {
    /// Applies one `--enable=` name. `all` switches everything on.
    pub fn enable(&mut self, name: &str) -> bool {
        match name {
            "warning" => self.warning = true,
            "style" => self.style = true,
            "performance" => self.performance = true,
            "portability" => self.portability = true,
            "information" => self.information = true,
            "all" => {
                *self = Self {
                    warning: true,
                    style: true,
                    performance: true,
                    portability: true,
                    information: true,
                };
            }
            _ => return false,
        }
        true
    }
}

/// All knobs of one analysis run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub platform: Platform,
    pub library: Library,
    pub enabled: EnabledChecks,
    /// Publish heuristic findings marked inconclusive.
    pub inconclusive: bool,
    /// Emit `valueFlowBailout`-class notes (information severity).
    pub debug_warnings: bool,
    /// Maximum template instantiation recursion.
    pub max_template_depth: u32,
    /// Value-flow passes rerun until a fixed point or this many rounds.
    pub max_valueflow_iterations: u32,
    /// How many levels of resolved calls the bounded evaluator follows
    /// into callee bodies before treating a call as opaque.
    pub max_call_depth: u32,
    /// Cap on the Cartesian product of argument value combinations.
    pub max_config_product: u32,
    /// Step budget for one evaluator run.
    pub max_evaluator_steps: u32,
    pub output_template: String,
    pub colors: Colors,
    pub suppressions: Suppressions,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            library: Library::builtin(),
            enabled: EnabledChecks::default(),
            inconclusive: false,
            debug_warnings: false,
            max_template_depth: 8,
            max_valueflow_iterations: 4,
            max_call_depth: 6,
            max_config_product: 256,
            max_evaluator_steps: 1024,
            output_template: DEFAULT_TEMPLATE.to_owned(),
            colors: Colors::default(),
            suppressions: Suppressions::new(),
            verbose: false,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error => true,
            Severity::Warning => self.enabled.warning,
            Severity::Style => self.enabled.style,
            Severity::Performance => self.enabled.performance,
            Severity::Portability => self.enabled.portability,
            Severity::Information => self.enabled.information,
        }
    }
}
