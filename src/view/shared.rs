//! Shared views
//!
//! A [`View`] is single-writer. [`SharedView`] puts one behind a mutex so
//! request handlers on different threads can render the same page; calls
//! on one view are serialized, distinct views render independently.

use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::Mutex;

use crate::attr::Value;
use crate::error::ViewResult;
use crate::target::{Dom, RenderTarget};

use super::{UpdateStats, View};

/// Thread-safe handle to a [`View`].
pub struct SharedView<T: RenderTarget = Dom>(Arc<Mutex<View<T>>>);

impl<T: RenderTarget> Clone for SharedView<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: RenderTarget> SharedView<T> {
    pub fn new(view: View<T>) -> Self {
        Self(Arc::new(Mutex::new(view)))
    }

    /// Run `f` with exclusive access to the view.
    pub fn with<R>(&self, f: impl FnOnce(&mut View<T>) -> R) -> R {
        f(&mut self.0.lock())
    }

    pub fn render(&self) -> ViewResult<String> {
        self.0.lock().render()
    }

    pub fn render_with<I, K, V>(&self, values: I) -> ViewResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<CompactString>,
        V: Into<Value>,
    {
        self.0.lock().render_with(values)
    }

    pub fn set_var(&self, name: &str, value: impl Into<Value>) -> ViewResult<UpdateStats> {
        self.0.lock().set_var(name, value)
    }
}

impl<T: RenderTarget> From<View<T>> for SharedView<T> {
    fn from(view: View<T>) -> Self {
        Self::new(view)
    }
}

/// Render every view, in parallel when the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
pub fn render_all<T>(views: &[SharedView<T>]) -> Vec<ViewResult<String>>
where
    T: RenderTarget + Send,
    T::Handle: Send,
{
    use rayon::prelude::*;

    views.par_iter().map(SharedView::render).collect()
}

/// Render every view, in parallel when the `parallel` feature is enabled.
#[cfg(not(feature = "parallel"))]
pub fn render_all<T: RenderTarget>(views: &[SharedView<T>]) -> Vec<ViewResult<String>> {
    views.iter().map(SharedView::render).collect()
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::html;

    fn greeting() -> SharedView {
        View::builder(html::p().bind("class", "tone").text("hello"))
            .var("tone", "calm")
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn test_concurrent_renders() {
        let view = greeting();
        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|tone| {
                let view = view.clone();
                thread::spawn(move || view.render_with([("tone", tone)]).unwrap())
            })
            .collect();

        for handle in handles {
            let out = handle.join().unwrap();
            assert!(out.starts_with(r#"<p class=""#));
            assert!(out.ends_with(">hello</p>"));
        }
    }

    #[test]
    fn test_render_all() {
        let views = [greeting(), greeting()];
        views[1].set_var("tone", "loud").unwrap();

        let out: Vec<String> = render_all(&views).into_iter().map(Result::unwrap).collect();
        assert_eq!(out, [r#"<p class="calm">hello</p>"#, r#"<p class="loud">hello</p>"#]);
    }

    #[test]
    fn test_with() {
        let view = greeting();
        let root = view.with(|v| v.root());
        view.with(|v| v.set(root, "id", "greeting"));
        assert_eq!(view.render().unwrap(), r#"<p class="calm" id="greeting">hello</p>"#);
    }
}
