//! Static integrity check over a whole topology, for use before handing it to
//! the engine. The engine still guards every push at runtime; this just finds
//! the problems up front.

use std::fmt;

use crate::menu::{Entry, EntryFlags, EntryKind, Menu, MenuId, MenuTable};
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub menu: MenuId,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: menu {}: {}", self.menu, self.message)
    }
}

pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

pub fn check_topology(menus: &MenuTable, store: &dyn SettingsStore, root: MenuId) -> Vec<Issue> {
    let mut issues = Vec::new();
    if menus.get(root).is_none() {
        issues.push(Issue {
            severity: Severity::Error,
            menu: root,
            message: "root menu does not exist".to_string(),
        });
    }

    for (id, menu) in menus.iter() {
        check_menu(menus, store, id, menu, &mut issues);
    }
    if menus.get(root).is_some() {
        check_reachability(menus, root, &mut issues);
    }

    issues.sort_by_key(|i| (std::cmp::Reverse(i.severity), i.menu));
    issues
}

fn check_menu(
    menus: &MenuTable,
    store: &dyn SettingsStore,
    id: MenuId,
    menu: &Menu,
    issues: &mut Vec<Issue>,
) {
    let mut report = |severity, message: String| {
        issues.push(Issue {
            severity,
            menu: id,
            message: format!("{}: {message}", menu.name()),
        });
    };

    if let Err(violation) = menu.verify() {
        report(Severity::Error, violation.to_string());
    }

    for entry in menu.body() {
        match entry.kind() {
            EntryKind::Submenu(child) if child == id => {
                report(Severity::Warning, format!("'{}' links back to its own menu", entry.text()));
            }
            EntryKind::Submenu(child) if menus.get(child).is_none() => {
                report(
                    Severity::Error,
                    format!("'{}' links to missing menu {child}", entry.text()),
                );
            }
            EntryKind::Setting(setting) if store.meta(setting).is_none() => {
                report(
                    Severity::Error,
                    format!(
                        "'{}' is bound to setting {} which has no metadata",
                        entry.text(),
                        setting.0
                    ),
                );
            }
            _ => {}
        }
    }

    let body = menu.body();
    if !body
        .iter()
        .any(|e| !e.flags().intersects(EntryFlags::HIDDEN | EntryFlags::DISABLED))
    {
        report(Severity::Warning, "no entry can take the cursor".to_string());
    }
    if !body.iter().any(|e| matches!(e.kind(), EntryKind::Back)) {
        report(Severity::Warning, "no back entry".to_string());
    }
}

fn links(menu: &Menu) -> impl Iterator<Item = MenuId> + '_ {
    menu.body().iter().filter_map(|e: &Entry| match e.kind() {
        EntryKind::Submenu(child) => Some(child),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    OnPath,
    Done,
}

/// Depth-first walk from the root with an explicit stack, reporting every
/// cycle it closes and every menu it never reaches.
fn check_reachability(menus: &MenuTable, root: MenuId, issues: &mut Vec<Issue>) {
    let slot = |id: MenuId| usize::from(id.0);
    let name = |id: MenuId| menus.get(id).map_or("?", Menu::name);

    let mut marks = vec![Mark::New; menus.len()];
    let mut path: Vec<(MenuId, usize)> = vec![(root, 0)];
    marks[slot(root)] = Mark::OnPath;

    while let Some(top) = path.last_mut() {
        let (id, next) = *top;
        top.1 += 1;

        let Some(child) = menus.get(id).and_then(|m| links(m).nth(next)) else {
            marks[slot(id)] = Mark::Done;
            path.pop();
            continue;
        };
        match marks.get(slot(child)).copied() {
            Some(Mark::New) => {
                marks[slot(child)] = Mark::OnPath;
                path.push((child, 0));
            }
            Some(Mark::OnPath) if child != id => {
                let start = path.iter().position(|(m, _)| *m == child).unwrap_or(0);
                let mut names: Vec<&str> = path[start..].iter().map(|(m, _)| name(*m)).collect();
                names.push(name(child));
                issues.push(Issue {
                    severity: Severity::Warning,
                    menu: id,
                    message: format!("cycle {}", names.join(" -> ")),
                });
            }
            _ => {}
        }
    }

    for (id, menu) in menus.iter() {
        if marks[slot(id)] == Mark::New {
            issues.push(Issue {
                severity: Severity::Warning,
                menu: id,
                message: format!("{}: not reachable from {}", menu.name(), name(root)),
            });
        }
    }
}
