/// Parser options.
///
/// Extensions gate grammar rules at parse time through semantic predicates;
/// the flag set is immutable for the lifetime of a parse.

/// Syntax extensions and filters recognised by the grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extensions {
    /// Smart punctuation: quotes, dashes, ellipses, apostrophes.
    pub smart: bool,
    /// Footnotes: `[^key]` references, `^[..]` inline notes, definitions.
    pub notes: bool,
    /// Strikethrough: `~~..~~`.
    pub strike: bool,
    /// Definition lists: title lines followed by `:`/`~` definitions.
    pub dlists: bool,
    /// Replace raw HTML blocks and inline HTML with empty output.
    pub filter_html: bool,
    /// Replace `<style>` blocks with empty output.
    pub filter_styles: bool,
}

impl Extensions {
    /// No extensions: classic Markdown only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every syntax extension on, filters off.
    pub fn all() -> Self {
        Extensions {
            smart: true,
            notes: true,
            strike: true,
            dlists: true,
            filter_html: false,
            filter_styles: false,
        }
    }

    pub fn smart(mut self, on: bool) -> Self {
        self.smart = on;
        self
    }

    pub fn notes(mut self, on: bool) -> Self {
        self.notes = on;
        self
    }

    pub fn strike(mut self, on: bool) -> Self {
        self.strike = on;
        self
    }

    pub fn dlists(mut self, on: bool) -> Self {
        self.dlists = on;
        self
    }

    pub fn filter_html(mut self, on: bool) -> Self {
        self.filter_html = on;
        self
    }

    pub fn filter_styles(mut self, on: bool) -> Self {
        self.filter_styles = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_plain_markdown() {
        let ext = Extensions::default();
        assert!(!ext.smart && !ext.notes && !ext.strike && !ext.dlists);
        assert!(!ext.filter_html && !ext.filter_styles);
    }

    #[test]
    fn setters_chain() {
        let ext = Extensions::none().smart(true).notes(true);
        assert!(ext.smart && ext.notes);
        assert!(!ext.strike);
    }
}
