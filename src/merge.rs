use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::package::Package;
use crate::package::rels::{REL_TYPE_IMAGE, Relationship, relative_target, resolve_target};
use crate::package::xml::{Element, Namespaces, Node, REL_NS, WML_NS};

/// Merges `packages` in order, separated by page breaks.
pub fn merge(packages: Vec<Package>) -> Result<Package> {
    let mut packages = packages.into_iter();
    let Some(mut base) = packages.next() else {
        return Err(Error::PackageAssembly("no documents to merge".into()));
    };
    let donors: Vec<Package> = packages.collect();
    if donors.is_empty() {
        return Ok(base);
    }

    let document_part = base.main_document_path()?;
    let mut tree = base.xml_part(&document_part)?;
    let mut rels = base.relationships(&document_part)?;
    let mut content_types = base.content_types()?;
    let mut root_ns = Namespaces::of(&tree.root);

    let w = root_ns
        .prefix_for(WML_NS)
        .map(str::to_string)
        .ok_or_else(|| Error::PackageAssembly("base document has no WordprocessingML namespace".into()))?;
    let Some(body) = find_body(&mut tree.root, &root_ns) else {
        return Err(Error::PackageAssembly("base document has no body".into()));
    };
    let mut merged = std::mem::take(&mut body.children);
    let section = take_section(&mut merged, &root_ns);

    let mut known_media: HashMap<Arc<[u8]>, String> = base
        .parts()
        .filter(|(name, _)| name.starts_with("word/media/"))
        .map(|(name, data)| (Arc::clone(data), name.to_string()))
        .collect();

    let mut new_declarations: Vec<(String, String)> = Vec::new();
    for (i, donor) in donors.iter().enumerate() {
        let doc = i + 1;
        let donor_part = donor.main_document_path()?;
        let mut donor_tree = donor.xml_part(&donor_part)?;
        let donor_rels = donor.relationships(&donor_part)?;
        let donor_ns = Namespaces::of(&donor_tree.root);

        let mut id_map: HashMap<String, String> = HashMap::new();
        for rel in donor_rels.iter() {
            let new_id = format!("doc{doc}_{}", rel.id);
            if rel.external {
                let mut imported = rel.clone();
                imported.id.clone_from(&new_id);
                rels.push(imported);
            } else if rel.is_image() {
                let source = resolve_target(&donor_part, &rel.target);
                let Some(data) = donor.shared_part(&source) else {
                    log::warn!("document {doc}: image {source} referenced by {} is missing", rel.id);
                    continue;
                };
                let path = match known_media.get(&data) {
                    Some(existing) => existing.clone(),
                    None => {
                        let file = source.rsplit('/').next().unwrap_or(&source);
                        let path = format!("word/media/doc{doc}_{file}");
                        if let Some((_, ext)) = file.rsplit_once('.') {
                            content_types.ensure_default(ext);
                        }
                        base.set_part(path.as_str(), Arc::clone(&data));
                        known_media.insert(data, path.clone());
                        path
                    }
                };
                rels.push(Relationship::new(
                    new_id.as_str(),
                    REL_TYPE_IMAGE,
                    relative_target(&document_part, &path),
                ));
            } else {
                log::debug!("document {doc}: not importing {} ({})", rel.id, rel.rel_type);
                continue;
            }
            id_map.insert(rel.id.clone(), new_id);
        }

        // Donor namespaces the base root does not bind are hoisted to it;
        // a prefix bound to another URI is declared on each imported node.
        let mut local: Vec<(String, String)> = Vec::new();
        for (prefix, uri) in donor_tree.root.declared_namespaces() {
            match root_ns.uri(prefix) {
                Some(bound) if bound == uri => {}
                Some(_) => local.push((prefix.to_string(), uri.to_string())),
                None => {
                    new_declarations.push((prefix.to_string(), uri.to_string()));
                    root_ns.declare(prefix, uri);
                }
            }
        }

        let Some(donor_body) = find_body(&mut donor_tree.root, &donor_ns) else {
            return Err(Error::PackageAssembly(format!("document {doc} has no body")));
        };
        let mut content = std::mem::take(&mut donor_body.children);
        take_section(&mut content, &donor_ns);

        merged.push(Node::Element(page_break(&w)));
        for mut node in content {
            match &mut node {
                Node::Element(el) => {
                    rewrite_references(el, &donor_ns, &id_map);
                    for (prefix, uri) in &local {
                        if el.attr(&xmlns_key(prefix)).is_none() {
                            el.set_attr(&xmlns_key(prefix), uri.as_str());
                        }
                    }
                }
                Node::Text(text) if text.trim().is_empty() => continue,
                _ => {}
            }
            merged.push(node);
        }
        log::debug!("merged document {doc} ({} relationships imported)", id_map.len());
    }

    merged.extend(section.map(Node::Element));
    for (prefix, uri) in new_declarations {
        tree.root.set_attr(&xmlns_key(&prefix), uri);
    }
    if let Some(body) = find_body(&mut tree.root, &root_ns) {
        body.children = merged;
    }

    base.set_xml_part(&document_part, &tree)?;
    base.set_relationships(&document_part, &rels)?;
    base.set_content_types(&content_types)?;
    Ok(base)
}

fn xmlns_key(prefix: &str) -> String {
    if prefix.is_empty() {
        "xmlns".to_string()
    } else {
        format!("xmlns:{prefix}")
    }
}

fn find_body<'a>(root: &'a mut Element, ns: &Namespaces) -> Option<&'a mut Element> {
    root.children
        .iter_mut()
        .filter_map(Node::as_element_mut)
        .find(|el| ns.is(el, WML_NS, "body"))
}

/// Removes and returns the body-level `w:sectPr`, which must stay last.
fn take_section(children: &mut Vec<Node>, ns: &Namespaces) -> Option<Element> {
    let index = children
        .iter()
        .rposition(|n| n.as_element().is_some_and(|el| ns.is(el, WML_NS, "sectPr")))?;
    match children.remove(index) {
        Node::Element(el) => Some(el),
        _ => None,
    }
}

fn page_break(w: &str) -> Element {
    Element::new(format!("{w}:p")).with_child(
        Element::new(format!("{w}:r"))
            .with_child(Element::new(format!("{w}:br")).with_attr(format!("{w}:type"), "page")),
    )
}

fn rewrite_references(el: &mut Element, ns: &Namespaces, id_map: &HashMap<String, String>) {
    let scope = ns.enter(el);
    for (key, value) in el.attrs.iter_mut() {
        if scope.attr_ns(key) != Some(REL_NS) {
            continue;
        }
        match id_map.get(value.as_str()) {
            Some(new_id) => value.clone_from(new_id),
            None if !value.is_empty() => {
                log::warn!("{key}=\"{value}\" has no imported relationship");
            }
            None => {}
        }
    }
    for child in el.children.iter_mut() {
        if let Node::Element(child) = child {
            rewrite_references(child, &scope, id_map);
        }
    }
}
