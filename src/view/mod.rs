pub mod scaffold_renderer;
