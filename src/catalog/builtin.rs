//! Built-in element table
//!
//! The element set the compiler knows without a host bridge: the canvas
//! and shape family, text, grid layout, brushes, transforms, a basic
//! animation type and the template/resource plumbing. Anything else
//! resolves through the bridge or fails as UnknownElement.

use super::{TypeCatalog, TypeKind};
use crate::value::{EnumTable, ValueKind};

pub static VISIBILITY: EnumTable = EnumTable {
    name: "Visibility",
    entries: &[("Visible", 0), ("Collapsed", 1)],
};

pub static STRETCH: EnumTable = EnumTable {
    name: "Stretch",
    entries: &[("None", 0), ("Fill", 1), ("Uniform", 2), ("UniformToFill", 3)],
};

pub static ORIENTATION: EnumTable = EnumTable {
    name: "Orientation",
    entries: &[("Horizontal", 0), ("Vertical", 1)],
};

/// Build the built-in catalog. Called once through `TypeCatalog::builtin`.
pub fn build() -> TypeCatalog {
    let mut c = TypeCatalog::default();

    c.register_enum(&VISIBILITY);
    c.register_enum(&STRETCH);
    c.register_enum(&ORIENTATION);

    // Collections and the resource dictionary come first so element
    // properties can reference their ids
    let ui_collection =
        c.register_type("UIElementCollection", None, TypeKind::Collection, None);
    let row_collection =
        c.register_type("RowDefinitionCollection", None, TypeKind::Collection, None);
    let col_collection = c.register_type(
        "ColumnDefinitionCollection",
        None,
        TypeKind::Collection,
        None,
    );
    let resources = c.register_type("ResourceDictionary", None, TypeKind::Dictionary, None);

    let transform = c.register_type("MatrixTransform", None, TypeKind::Element, None);
    c.register_property(transform, "Matrix", ValueKind::Matrix);

    let brush = c.register_type("SolidColorBrush", None, TypeKind::Element, None);
    c.register_property(brush, "Color", ValueKind::Color);
    c.register_property(brush, "Opacity", ValueKind::Double);

    // Base of everything visual
    let fe = c.register_type("FrameworkElement", None, TypeKind::Element, None);
    c.register_property(fe, "Width", ValueKind::Double);
    c.register_property(fe, "Height", ValueKind::Double);
    c.register_property(fe, "Opacity", ValueKind::Double);
    c.register_property(fe, "Margin", ValueKind::Thickness);
    c.register_property(fe, "Tag", ValueKind::String);
    c.register_property_full(
        fe,
        "Visibility",
        ValueKind::Int32,
        None,
        false,
        Some(&VISIBILITY),
    );
    c.register_property_full(fe, "ActualWidth", ValueKind::Double, None, true, None);
    c.register_property_full(
        fe,
        "Resources",
        ValueKind::Object,
        Some(resources),
        true,
        None,
    );
    c.register_property_full(
        fe,
        "RenderTransform",
        ValueKind::Object,
        Some(transform),
        false,
        None,
    );

    let panel = c.register_type("Panel", Some(fe), TypeKind::Element, Some("Children"));
    c.register_property_full(
        panel,
        "Children",
        ValueKind::Object,
        Some(ui_collection),
        true,
        None,
    );
    c.register_property_full(panel, "Background", ValueKind::Color, None, false, None);

    let canvas = c.register_type("Canvas", Some(panel), TypeKind::Element, None);
    // Attached coordinates, settable on any child via Canvas.Left syntax
    c.register_property(canvas, "Left", ValueKind::Double);
    c.register_property(canvas, "Top", ValueKind::Double);

    let stack = c.register_type("StackPanel", Some(panel), TypeKind::Element, None);
    c.register_property_full(
        stack,
        "Orientation",
        ValueKind::Int32,
        None,
        false,
        Some(&ORIENTATION),
    );

    let grid = c.register_type("Grid", Some(panel), TypeKind::Element, None);
    c.register_property(grid, "Row", ValueKind::Int32);
    c.register_property(grid, "Column", ValueKind::Int32);
    c.register_property_full(
        grid,
        "RowDefinitions",
        ValueKind::Object,
        Some(row_collection),
        true,
        None,
    );
    c.register_property_full(
        grid,
        "ColumnDefinitions",
        ValueKind::Object,
        Some(col_collection),
        true,
        None,
    );

    // Grid track definitions are not framework elements; their Width and
    // Height are grid lengths, not layout doubles
    let row_def = c.register_type("RowDefinition", None, TypeKind::Element, None);
    c.register_property(row_def, "Height", ValueKind::GridLength);
    let col_def = c.register_type("ColumnDefinition", None, TypeKind::Element, None);
    c.register_property(col_def, "Width", ValueKind::GridLength);

    let shape = c.register_type("Shape", Some(fe), TypeKind::Element, None);
    c.register_property(shape, "Fill", ValueKind::Color);
    c.register_property(shape, "Stroke", ValueKind::Color);
    c.register_property(shape, "StrokeThickness", ValueKind::Double);
    c.register_property_full(
        shape,
        "Stretch",
        ValueKind::Int32,
        None,
        false,
        Some(&STRETCH),
    );

    let rectangle = c.register_type("Rectangle", Some(shape), TypeKind::Element, None);
    c.register_property(rectangle, "RadiusX", ValueKind::Double);
    c.register_property(rectangle, "RadiusY", ValueKind::Double);

    let line = c.register_type("Line", Some(shape), TypeKind::Element, None);
    c.register_property(line, "X1", ValueKind::Double);
    c.register_property(line, "Y1", ValueKind::Double);
    c.register_property(line, "X2", ValueKind::Double);
    c.register_property(line, "Y2", ValueKind::Double);

    c.register_type("Ellipse", Some(shape), TypeKind::Element, None);

    let path = c.register_type("Path", Some(shape), TypeKind::Element, None);
    c.register_property(path, "Data", ValueKind::PathGeometry);

    let polyline = c.register_type("Polyline", Some(shape), TypeKind::Element, None);
    c.register_property(polyline, "Points", ValueKind::PointList);
    let polygon = c.register_type("Polygon", Some(shape), TypeKind::Element, None);
    c.register_property(polygon, "Points", ValueKind::PointList);

    let text = c.register_type("TextBlock", Some(fe), TypeKind::Element, Some("Text"));
    c.register_property(text, "Text", ValueKind::String);
    c.register_property(text, "FontSize", ValueKind::Double);
    c.register_property(text, "Foreground", ValueKind::Color);

    let border = c.register_type("Border", Some(fe), TypeKind::Element, Some("Child"));
    c.register_property_full(border, "Child", ValueKind::Object, None, false, None);
    c.register_property(border, "Background", ValueKind::Color);
    c.register_property(border, "BorderBrush", ValueKind::Color);
    c.register_property(border, "BorderThickness", ValueKind::Thickness);
    c.register_property(border, "CornerRadius", ValueKind::CornerRadius);

    let animation = c.register_type("DoubleAnimation", None, TypeKind::Element, None);
    c.register_property(animation, "From", ValueKind::Double);
    c.register_property(animation, "To", ValueKind::Double);
    c.register_property(animation, "Duration", ValueKind::Duration);
    c.register_property(animation, "BeginTime", ValueKind::TimeSpan);
    c.register_property(animation, "RepeatBehavior", ValueKind::RepeatCount);
    c.register_property(animation, "AutoReverse", ValueKind::Bool);

    let template = c.register_type("ControlTemplate", None, TypeKind::Template, None);
    c.register_property(template, "TargetType", ValueKind::String);

    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_inherits_children_content() {
        let c = build();
        let canvas = c.resolve_type("Canvas").unwrap().id;
        let token = c.content_property(canvas).unwrap();
        let prop = c.property(token).unwrap();
        assert_eq!(prop.name, "Children");
        assert!(prop.read_only);
        let children_type = prop.object_type.unwrap();
        assert!(c.type_by_id(children_type).unwrap().is_collection());
    }

    #[test]
    fn test_attached_coordinates_live_on_canvas() {
        let c = build();
        let canvas = c.resolve_type("Canvas").unwrap().id;
        let rectangle = c.resolve_type("Rectangle").unwrap().id;
        assert!(c.property_by_name(canvas, "Left").is_some());
        // Not reachable from Rectangle directly; attached syntax resolves
        // against the owner type
        assert_eq!(c.property_by_name(rectangle, "Left"), None);
    }

    #[test]
    fn test_grid_track_width_is_grid_length() {
        let c = build();
        let col = c.resolve_type("ColumnDefinition").unwrap().id;
        let token = c.property_by_name(col, "Width").unwrap();
        assert_eq!(c.property(token).unwrap().kind, ValueKind::GridLength);

        // FrameworkElement Width stays a plain double
        let rect = c.resolve_type("Rectangle").unwrap().id;
        let token = c.property_by_name(rect, "Width").unwrap();
        assert_eq!(c.property(token).unwrap().kind, ValueKind::Double);
    }

    #[test]
    fn test_template_defers() {
        let c = build();
        assert!(c.resolve_type("ControlTemplate").unwrap().defers_content());
        assert!(!c.resolve_type("Canvas").unwrap().defers_content());
    }

    #[test]
    fn test_enum_tables_registered() {
        let c = build();
        assert!(c.enum_table("Visibility").is_some());
        assert!(c.enum_table("Orientation").is_some());
        assert!(c.enum_table("Unknown").is_none());
    }
}
