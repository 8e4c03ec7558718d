//! In-place pathway edits.
//!
//! Every operation either applies completely or leaves the pathway untouched.
//! Indices are 0-based.

use super::model::{Module, ModulePosition, Pathway, Section};
use crate::types::{PathwayError, Result};

impl Pathway {
    fn check_section(&self, section: usize) -> Result<()> {
        let len = self.sections().len();
        if section >= len {
            return Err(PathwayError::out_of_range("section", section, len));
        }
        Ok(())
    }

    fn check_module(&self, section: usize, module: usize) -> Result<()> {
        self.check_section(section)?;
        let len = self.sections()[section].modules().len();
        if module >= len {
            return Err(PathwayError::out_of_range("module", module, len));
        }
        Ok(())
    }

    /// Move a module to another position within its section
    pub fn reorder_module(&mut self, section: usize, from: usize, to: usize) -> Result<()> {
        self.check_module(section, from)?;
        self.check_module(section, to)?;

        let modules = self.sections_mut()[section].modules_mut();
        let module = modules.remove(from);
        modules.insert(to, module);
        Ok(())
    }

    /// Move a module to the end of another section.
    ///
    /// Moving within the same section reorders it to the end. Fails with
    /// `WouldEmptySection` when the module is the last one in its section.
    pub fn move_module(
        &mut self,
        from_section: usize,
        to_section: usize,
        module_index: usize,
    ) -> Result<ModulePosition> {
        self.check_module(from_section, module_index)?;
        self.check_section(to_section)?;

        if from_section == to_section {
            let last = self.sections()[from_section].modules().len() - 1;
            self.reorder_module(from_section, module_index, last)?;
            return Ok(ModulePosition {
                section: from_section,
                module: last,
            });
        }

        if self.sections()[from_section].modules().len() == 1 {
            return Err(PathwayError::WouldEmptySection {
                section: from_section,
            });
        }

        let sections = self.sections_mut();
        let module = sections[from_section].modules_mut().remove(module_index);
        let target = sections[to_section].modules_mut();
        target.push(module);

        Ok(ModulePosition {
            section: to_section,
            module: target.len() - 1,
        })
    }

    /// Replace a module's content, returning the previous content
    pub fn replace_module_content(
        &mut self,
        section: usize,
        module: usize,
        content: impl Into<String>,
    ) -> Result<String> {
        self.check_module(section, module)?;

        let target = &mut self.sections_mut()[section].modules_mut()[module];
        Ok(target.set_content(content.into()))
    }

    /// Append a module to the end of a section
    pub fn append_module(&mut self, section: usize, module: Module) -> Result<ModulePosition> {
        self.check_section(section)?;
        module.validate()?;

        let modules = self.sections_mut()[section].modules_mut();
        modules.push(module);
        Ok(ModulePosition {
            section,
            module: modules.len() - 1,
        })
    }

    /// Merge a section into this pathway.
    ///
    /// Modules go into the existing section with the same title (compared
    /// case-insensitively, ignoring surrounding whitespace), or a new section
    /// is appended when none matches. Modules whose content fingerprint is
    /// already present in the target are skipped. Returns the target section
    /// index and the number of modules added.
    pub fn merge_section(&mut self, incoming: Section) -> Result<(usize, usize)> {
        incoming.validate()?;

        let wanted = incoming.title().trim().to_lowercase();
        let existing = self
            .sections()
            .iter()
            .position(|s| s.title().trim().to_lowercase() == wanted);

        let Some(index) = existing else {
            let added = incoming.modules().len();
            let sections = self.sections_mut();
            sections.push(incoming);
            return Ok((sections.len() - 1, added));
        };

        let mut seen: Vec<String> = self.sections()[index]
            .modules()
            .iter()
            .map(Module::fingerprint)
            .collect();

        let modules = self.sections_mut()[index].modules_mut();
        let before = modules.len();
        for module in incoming.modules() {
            let fingerprint = module.fingerprint();
            if !seen.contains(&fingerprint) {
                seen.push(fingerprint);
                modules.push(module.clone());
            }
        }
        Ok((index, modules.len() - before))
    }

    /// Move a section to another position
    pub fn reorder_section(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_section(from)?;
        self.check_section(to)?;

        let sections = self.sections_mut();
        let section = sections.remove(from);
        sections.insert(to, section);
        Ok(())
    }
}
