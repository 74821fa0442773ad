use crate::geometry::EmuRect;
use crate::package::xml::{DML_NS, Element, PIC_NS, REL_NS, WPD_NS, WPS_NS};

fn zero_effect_extent() -> Element {
    Element::new("wp:effectExtent")
        .with_attr("l", "0")
        .with_attr("t", "0")
        .with_attr("r", "0")
        .with_attr("b", "0")
}

fn extent(cx: i64, cy: i64) -> Element {
    Element::new("wp:extent")
        .with_attr("cx", cx.to_string())
        .with_attr("cy", cy.to_string())
}

fn doc_pr(id: u32, name: &str) -> Element {
    Element::new("wp:docPr")
        .with_attr("id", id.to_string())
        .with_attr("name", name)
}

fn xfrm(x: i64, y: i64, cx: i64, cy: i64) -> Element {
    Element::new("a:xfrm")
        .with_child(
            Element::new("a:off")
                .with_attr("x", x.to_string())
                .with_attr("y", y.to_string()),
        )
        .with_child(
            Element::new("a:ext")
                .with_attr("cx", cx.to_string())
                .with_attr("cy", cy.to_string()),
        )
}

fn rect_geometry() -> Element {
    Element::new("a:prstGeom")
        .with_attr("prst", "rect")
        .with_child(Element::new("a:avLst"))
}

/// `a:graphic` holding a stretched picture that cites `rel_id`.
pub fn picture_graphic(rel_id: &str, id: u32, name: &str, cx: i64, cy: i64) -> Element {
    let pic = Element::new("pic:pic")
        .with_attr("xmlns:pic", PIC_NS)
        .with_child(
            Element::new("pic:nvPicPr")
                .with_child(
                    Element::new("pic:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", name),
                )
                .with_child(
                    Element::new("pic:cNvPicPr").with_child(
                        Element::new("a:picLocks").with_attr("noChangeAspect", "1"),
                    ),
                ),
        )
        .with_child(
            Element::new("pic:blipFill")
                .with_child(
                    Element::new("a:blip")
                        .with_attr("xmlns:r", REL_NS)
                        .with_attr("r:embed", rel_id),
                )
                .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect"))),
        )
        .with_child(
            Element::new("pic:spPr")
                .with_child(xfrm(0, 0, cx, cy))
                .with_child(rect_geometry()),
        );

    Element::new("a:graphic").with_attr("xmlns:a", DML_NS).with_child(
        Element::new("a:graphicData")
            .with_attr("uri", PIC_NS)
            .with_child(pic),
    )
}

pub fn text_box_graphic(cx: i64, cy: i64, content: Element) -> Element {
    let no_fill = || Element::new("a:noFill");
    let shape = Element::new("wps:wsp")
        .with_attr("xmlns:wps", WPS_NS)
        .with_child(
            Element::new("wps:cNvSpPr")
                .with_attr("txBx", "1")
                .with_child(Element::new("a:spLocks").with_attr("noChangeArrowheads", "1")),
        )
        .with_child(
            Element::new("wps:spPr")
                .with_child(xfrm(0, 0, cx, cy))
                .with_child(rect_geometry())
                .with_child(no_fill())
                .with_child(Element::new("a:ln").with_child(no_fill())),
        )
        .with_child(Element::new("wps:txbx").with_child(content))
        .with_child(
            Element::new("wps:bodyPr")
                .with_attr("rot", "0")
                .with_attr("anchor", "t")
                .with_attr("lIns", "36000")
                .with_attr("tIns", "36000")
                .with_attr("rIns", "36000")
                .with_attr("bIns", "36000")
                .with_child(Element::new("a:noAutofit")),
        );

    Element::new("a:graphic").with_attr("xmlns:a", DML_NS).with_child(
        Element::new("a:graphicData")
            .with_attr("uri", WPS_NS)
            .with_child(shape),
    )
}

pub fn inline_drawing(id: u32, name: &str, cx: i64, cy: i64, graphic: Element) -> Element {
    let inline = Element::new("wp:inline")
        .with_attr("xmlns:wp", WPD_NS)
        .with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
        .with_child(extent(cx, cy))
        .with_child(zero_effect_extent())
        .with_child(doc_pr(id, name))
        .with_child(
            Element::new("wp:cNvGraphicFramePr").with_child(
                Element::new("a:graphicFrameLocks")
                    .with_attr("xmlns:a", DML_NS)
                    .with_attr("noChangeAspect", "1"),
            ),
        )
        .with_child(graphic);
    Element::new("w:drawing").with_child(inline)
}

pub fn anchored_drawing(
    id: u32,
    name: &str,
    rect: EmuRect,
    behind_text: bool,
    graphic: Element,
) -> Element {
    let position = |axis: &str, offset: i64| {
        Element::new(format!("wp:position{axis}"))
            .with_attr("relativeFrom", "page")
            .with_child(Element::new("wp:posOffset").with_text(offset.to_string()))
    };
    let anchor = Element::new("wp:anchor")
        .with_attr("xmlns:wp", WPD_NS)
        .with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
        .with_attr("simplePos", "0")
        .with_attr("relativeHeight", if behind_text { "1" } else { "251659264" })
        .with_attr("behindDoc", if behind_text { "1" } else { "0" })
        .with_attr("locked", "0")
        .with_attr("layoutInCell", "1")
        .with_attr("allowOverlap", "1")
        .with_child(Element::new("wp:simplePos").with_attr("x", "0").with_attr("y", "0"))
        .with_child(position("H", rect.x))
        .with_child(position("V", rect.y))
        .with_child(extent(rect.cx, rect.cy))
        .with_child(zero_effect_extent())
        .with_child(Element::new("wp:wrapNone"))
        .with_child(doc_pr(id, name))
        .with_child(Element::new("wp:cNvGraphicFramePr"))
        .with_child(graphic);
    Element::new("w:drawing").with_child(anchor)
}
