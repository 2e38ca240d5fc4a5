//! Instruction materialization against the request state.

use edge_streaming::{HtmlString, InstructionHandler, InstructionKind, RenderInstruction};
use tracing::{debug, warn};

use crate::context::RenderContext;

impl InstructionHandler for RenderContext {
    fn materialize(&self, instruction: &RenderInstruction) -> Option<HtmlString> {
        let config = self.config();
        let mut state = self.state();

        let html = match &instruction.kind {
            InstructionKind::HydrationScript => {
                if std::mem::replace(&mut state.hydration_rendered, true) {
                    return None;
                }
                config.hydration_script.as_deref().map(HtmlString::trusted)
            }
            InstructionKind::Directive(name) => {
                if !state.directives_rendered.insert(name.clone()) {
                    return None;
                }
                match config.directive_scripts.get(name) {
                    Some(script) => Some(HtmlString::trusted(script.as_str())),
                    None => {
                        warn!(directive = %name, "no script configured for client directive");
                        None
                    }
                }
            }
            InstructionKind::MaybeHead if self.is_partial() => None,
            InstructionKind::Head | InstructionKind::MaybeHead => {
                if std::mem::replace(&mut state.head_rendered, true) {
                    return None;
                }
                Some(state.head.render())
            }
            InstructionKind::ServerIslandRuntime => {
                if std::mem::replace(&mut state.island_runtime_rendered, true) {
                    return None;
                }
                config.server_island_script.as_deref().map(HtmlString::trusted)
            }
        };

        debug!(kind = ?instruction.kind, emitted = html.is_some(), "materialized instruction");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head::HeadItems;
    use edge_core::RenderConfig;

    fn text(ctx: &RenderContext, instruction: RenderInstruction) -> Option<String> {
        ctx.materialize(&instruction).map(HtmlString::into_string)
    }

    fn config() -> RenderConfig {
        RenderConfig::default()
            .with_hydration_script("<script>hydrate()</script>")
            .with_directive_script("visible", "<script>visible()</script>")
    }

    #[test]
    fn test_hydration_script_once() {
        let ctx = RenderContext::new(config());
        assert_eq!(
            text(&ctx, RenderInstruction::hydration_script()).as_deref(),
            Some("<script>hydrate()</script>")
        );
        assert_eq!(text(&ctx, RenderInstruction::hydration_script()), None);
    }

    #[test]
    fn test_directive_once_per_name() {
        let ctx = RenderContext::new(config());
        assert!(text(&ctx, RenderInstruction::directive("visible")).is_some());
        assert!(text(&ctx, RenderInstruction::directive("visible")).is_none());
        assert!(text(&ctx, RenderInstruction::directive("idle")).is_none());
    }

    #[test]
    fn test_head_renders_collected_items_once() {
        let ctx = RenderContext::new(config());
        ctx.add_head(HeadItems::new().with_stylesheet("/a.css"));
        assert_eq!(
            text(&ctx, RenderInstruction::maybe_head()).as_deref(),
            Some(r#"<link rel="stylesheet" href="/a.css">"#)
        );
        assert!(text(&ctx, RenderInstruction::head()).is_none());
    }

    #[test]
    fn test_maybe_head_skipped_for_partials() {
        let ctx = RenderContext::builder().partial(true).build();
        ctx.add_head(HeadItems::new().with_style("p{}"));
        assert!(text(&ctx, RenderInstruction::maybe_head()).is_none());
        assert_eq!(
            text(&ctx, RenderInstruction::head()).as_deref(),
            Some("<style>p{}</style>")
        );
    }

    #[test]
    fn test_server_island_runtime_once() {
        let mut config = config();
        config.server_island_script = Some("<script>islands()</script>".to_string());
        let ctx = RenderContext::new(config);
        assert!(text(&ctx, RenderInstruction::server_island_runtime()).is_some());
        assert!(text(&ctx, RenderInstruction::server_island_runtime()).is_none());
    }
}
