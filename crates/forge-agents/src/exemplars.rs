//! Few-shot exemplar gallery.
//!
//! A small set of high-quality reference outputs keyed by component type,
//! included in the generation prompt to steer style and structure. The
//! prompt budget caps selection at two.

use std::collections::HashMap;

use forge_core::requirements::ComponentType;

/// Hard cap on exemplars per prompt.
pub const MAX_EXEMPLARS: usize = 2;

#[derive(Debug, Clone)]
pub struct Exemplar {
    pub name: &'static str,
    pub component_type: ComponentType,
    pub code: &'static str,
}

const ICON_BUTTON_EXEMPLAR: &str = r#"import * as React from "react";

export interface IconButtonProps
  extends React.ButtonHTMLAttributes<HTMLButtonElement> {
  label: string;
  icon: React.ReactNode;
}

export const IconButton = React.forwardRef<HTMLButtonElement, IconButtonProps>(
  ({ label, icon, ...props }, ref) => (
    <button
      ref={ref}
      type="button"
      aria-label={label}
      style={{
        display: "inline-flex",
        padding: "var(--spacing-sm)",
        borderRadius: "var(--radius-md)",
        backgroundColor: "var(--color-primary)",
        color: "var(--color-background)",
      }}
      {...props}
    >
      <span aria-hidden="true">{icon}</span>
    </button>
  ),
);
IconButton.displayName = "IconButton";
"#;

const STAT_CARD_EXEMPLAR: &str = r#"import * as React from "react";

export interface StatCardProps {
  label: string;
  value: string;
  trend?: "up" | "down";
}

export function StatCard({ label, value, trend }: StatCardProps) {
  return (
    <div
      style={{
        padding: "var(--spacing-lg)",
        border: "1px solid var(--color-border)",
        borderRadius: "var(--radius-lg)",
        backgroundColor: "var(--color-background)",
      }}
    >
      <p style={{ fontSize: "var(--font-size-sm)", color: "var(--color-muted)" }}>
        {label}
      </p>
      <p
        style={{
          fontSize: "var(--font-size-2xl)",
          fontWeight: "var(--font-weight-bold)",
          color: trend === "down" ? "var(--color-destructive)" : "var(--color-foreground)",
        }}
      >
        {value}
      </p>
    </div>
  );
}
"#;

const SEARCH_INPUT_EXEMPLAR: &str = r#"import * as React from "react";

export interface SearchInputProps
  extends Omit<React.InputHTMLAttributes<HTMLInputElement>, "type"> {
  label: string;
  onSearch: (query: string) => void;
}

export const SearchInput = React.forwardRef<HTMLInputElement, SearchInputProps>(
  ({ label, onSearch, id, ...props }, ref) => {
    const reactId = React.useId();
    const inputId = id ?? reactId;
    return (
      <div style={{ display: "flex", flexDirection: "column", gap: "var(--spacing-xs)" }}>
        <label htmlFor={inputId} style={{ fontSize: "var(--font-size-sm)" }}>
          {label}
        </label>
        <input
          ref={ref}
          id={inputId}
          type="search"
          onKeyDown={(event) => {
            if (event.key === "Enter") {
              onSearch(event.currentTarget.value);
            }
          }}
          style={{
            padding: "var(--spacing-sm) var(--spacing-md)",
            border: "1px solid var(--color-border)",
            borderRadius: "var(--radius-md)",
          }}
          {...props}
        />
      </div>
    );
  },
);
SearchInput.displayName = "SearchInput";
"#;

/// Gallery keyed by component type.
pub struct ExemplarGallery {
    by_type: HashMap<ComponentType, Vec<Exemplar>>,
}

impl ExemplarGallery {
    /// The built-in gallery.
    pub fn builtin() -> Self {
        let exemplars = vec![
            Exemplar {
                name: "icon-button",
                component_type: ComponentType::Button,
                code: ICON_BUTTON_EXEMPLAR,
            },
            Exemplar {
                name: "stat-card",
                component_type: ComponentType::Card,
                code: STAT_CARD_EXEMPLAR,
            },
            Exemplar {
                name: "search-input",
                component_type: ComponentType::Input,
                code: SEARCH_INPUT_EXEMPLAR,
            },
        ];
        let mut by_type: HashMap<ComponentType, Vec<Exemplar>> = HashMap::new();
        for exemplar in exemplars {
            by_type.entry(exemplar.component_type).or_default().push(exemplar);
        }
        Self { by_type }
    }

    /// Up to [`MAX_EXEMPLARS`] exemplars for the component type.
    pub fn select(&self, component_type: ComponentType) -> Vec<&Exemplar> {
        self.by_type
            .get(&component_type)
            .map(|list| list.iter().take(MAX_EXEMPLARS).collect())
            .unwrap_or_default()
    }
}
