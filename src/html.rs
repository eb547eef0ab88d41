//! Tag constructors for the HTML element family
//!
//! ```ignore
//! use tola_view::html::*;
//!
//! let page = html().child(body().child(div().attr("class", ["btn", "btn-large"])));
//! ```

define_tags!(
    // document
    html, head, title, body, meta, link, script, style, base,
    // sections and grouping
    div, span, p, a, h1, h2, h3, h4, h5, h6, header, footer, nav, section, article, aside, main,
    blockquote, pre, code, hr, br, b, i, em, strong, small, sub, sup, label,
    // lists
    ul, ol, li, dl, dt, dd,
    // tables
    table, thead, tbody, tfoot, tr, td, th, caption,
    // embedded content
    img, map, area, iframe, video, audio, source, track, canvas, picture, figure, figcaption,
    // forms
    form, fieldset, legend, input, textarea, button, select, option, optgroup,
);
